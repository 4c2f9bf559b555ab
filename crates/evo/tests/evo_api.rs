use boletera_evo::EvoClient;
use boletera_recon::{ItemKind, SaleSource};
use chrono::NaiveDate;
use httpmock::prelude::*;

fn client(server: &MockServer) -> EvoClient {
    EvoClient::new(server.base_url(), server.base_url(), "gym", "secret").unwrap()
}

#[test]
fn receivables_map_wrapped_payload() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/receivables")
            .query_param("idBranchMember", "1")
            .query_param("status", "2")
            .query_param("skip", "0");
        then.status(200).json_body(serde_json::json!({
            "receivables": [{
                "idReceivable": 700,
                "idSale": 55,
                "payerName": "Juan Pérez",
                "document": "12.345.678-5",
                "ammountPaid": 59500.0,
                "saleDate": "2025-08-24T10:31:00"
            }]
        }));
    });

    let day = NaiveDate::from_ymd_opt(2025, 8, 24).unwrap();
    let sales = client(&server).fetch_receivables(1, day).unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].id_receivable, 700);
    assert_eq!(sales[0].id_sale, 55);
    assert_eq!(sales[0].id_branch, 1);
    assert_eq!(sales[0].amount_paid, 59500);
    assert_eq!(sales[0].sale_date, Some(day));
    assert_eq!(sales[0].payer_name.as_deref(), Some("Juan Pérez"));
}

#[test]
fn receivables_accept_bare_array() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/receivables").query_param("skip", "0");
        then.status(200).json_body(serde_json::json!([
            { "idReceivable": 701, "ammountPaid": 10000.0 }
        ]));
    });

    let day = NaiveDate::from_ymd_opt(2025, 8, 24).unwrap();
    let sales = client(&server).fetch_receivables(3, day).unwrap();
    assert_eq!(sales.len(), 1);
    // Missing idSale falls back to the receivable id.
    assert_eq!(sales[0].id_sale, 701);
    assert_eq!(sales[0].sale_date, None);
}

#[test]
fn receivables_paginate_until_short_page() {
    let server = MockServer::start();
    let full_page: Vec<serde_json::Value> = (0..50)
        .map(|i| serde_json::json!({ "idReceivable": i, "ammountPaid": 1000.0 }))
        .collect();
    server.mock(|when, then| {
        when.method(GET).path("/receivables").query_param("skip", "0");
        then.status(200).json_body(serde_json::json!(full_page));
    });
    server.mock(|when, then| {
        when.method(GET).path("/receivables").query_param("skip", "50");
        then.status(200).json_body(serde_json::json!([
            { "idReceivable": 50, "ammountPaid": 1000.0 }
        ]));
    });

    let day = NaiveDate::from_ymd_opt(2025, 8, 24).unwrap();
    let sales = client(&server).fetch_receivables(1, day).unwrap();
    assert_eq!(sales.len(), 51);
}

#[test]
fn sale_items_carry_category_and_rounded_price() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/sales/55");
        then.status(200).json_body(serde_json::json!({
            "idMember": 9,
            "saleItens": [
                { "description": "Mensualidad", "itemValue": 50000.4, "quantity": 1, "idMembership": 3 },
                { "item": "Botella", "itemValue": 5000.0, "idProduct": 12 }
            ]
        }));
    });

    let items = client(&server).sale_items(55).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].unit_price, 50000);
    assert_eq!(items[0].category.unwrap().kind, ItemKind::Membership);
    // "item" is the fallback description field; quantity defaults to 1.
    assert_eq!(items[1].description, "Botella");
    assert_eq!(items[1].quantity, 1);
    assert_eq!(items[1].category.unwrap().kind, ItemKind::Product);
}

#[test]
fn payer_identity_joins_member_names() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/sales/55");
        then.status(200).json_body(serde_json::json!({ "idMember": 9, "saleItens": [] }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/members/9");
        then.status(200).json_body(serde_json::json!({
            "firstName": "Juan",
            "lastName": "Pérez",
            "document": "12345678-5",
            "email": "juan@example.com"
        }));
    });

    let identity = client(&server).payer_identity(55).unwrap().unwrap();
    assert_eq!(identity.name.as_deref(), Some("Juan Pérez"));
    assert_eq!(identity.document.as_deref(), Some("12345678-5"));
}

#[test]
fn sale_without_member_yields_no_identity() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/sales/56");
        then.status(200).json_body(serde_json::json!({ "saleItens": [] }));
    });

    assert!(client(&server).payer_identity(56).unwrap().is_none());
}
