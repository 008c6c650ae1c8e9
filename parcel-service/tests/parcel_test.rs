mod common;

use common::TestApp;
use mongodb::bson::oid::ObjectId;
use serde_json::{json, Value};

#[tokio::test]
async fn new_parcel_is_pending_and_unpaid() {
    let app = TestApp::spawn().await;

    let id = app.create_parcel("sender@example.com").await;
    let parcel = app.get_parcel(&id).await;

    assert_eq!(parcel["status"], "pending");
    assert_eq!(parcel["payment_status"], "unpaid");
    assert!(parcel.get("transactionId").is_none());
    assert_eq!(parcel["email"], "sender@example.com");
    assert_eq!(parcel["destination"], "Dhaka");

    app.cleanup().await;
}

#[tokio::test]
async fn create_rejects_invalid_sender_email() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/parcels", app.address))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn list_filters_by_sender_newest_first() {
    let app = TestApp::spawn().await;

    let first = app.create_parcel("alice@example.com").await;
    // createdAt has millisecond precision; keep the orders distinct.
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let second = app.create_parcel("alice@example.com").await;
    app.create_parcel("bob@example.com").await;

    let response = app
        .client
        .get(format!("{}/parcels?email=alice@example.com", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let parcels: Vec<Value> = response.json().await.expect("Invalid list body");
    assert_eq!(parcels.len(), 2);
    assert_eq!(parcels[0]["id"], second.as_str());
    assert_eq!(parcels[1]["id"], first.as_str());

    let response = app
        .client
        .get(format!("{}/parcels", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    let all: Vec<Value> = response.json().await.expect("Invalid list body");
    assert_eq!(all.len(), 3);

    app.cleanup().await;
}

#[tokio::test]
async fn get_unknown_parcel_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/parcels/{}", app.address, ObjectId::new().to_hex()))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn get_malformed_parcel_id_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/parcels/not-a-valid-id", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn update_merges_supplied_fields() {
    let app = TestApp::spawn().await;

    let id = app.create_parcel("sender@example.com").await;

    let response = app
        .client
        .patch(format!("{}/parcels/{}", app.address, id))
        .json(&json!({ "destination": "Chittagong", "notes": "fragile" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let ack: Value = response.json().await.expect("Invalid update ack");
    assert_eq!(ack["matchedCount"], 1);

    let parcel = app.get_parcel(&id).await;
    assert_eq!(parcel["destination"], "Chittagong");
    assert_eq!(parcel["notes"], "fragile");
    // Untouched fields survive the merge.
    assert_eq!(parcel["parcelType"], "document");

    app.cleanup().await;
}

#[tokio::test]
async fn update_cannot_touch_payment_fields() {
    let app = TestApp::spawn().await;

    let id = app.create_parcel("sender@example.com").await;

    let response = app
        .client
        .patch(format!("{}/parcels/{}", app.address, id))
        .json(&json!({ "payment_status": "paid", "status": "booked" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 400);

    let parcel = app.get_parcel(&id).await;
    assert_eq!(parcel["payment_status"], "unpaid");

    app.cleanup().await;
}

#[tokio::test]
async fn update_unknown_parcel_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .patch(format!("{}/parcels/{}", app.address, ObjectId::new().to_hex()))
        .json(&json!({ "destination": "Sylhet" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_is_idempotent() {
    let app = TestApp::spawn().await;

    let id = app.create_parcel("sender@example.com").await;

    let response = app
        .client
        .delete(format!("{}/parcels/{}", app.address, id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.expect("Invalid delete ack");
    assert_eq!(ack["deletedCount"], 1);

    // Deleting again is a zero-count success, not an error.
    let response = app
        .client
        .delete(format!("{}/parcels/{}", app.address, id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.expect("Invalid delete ack");
    assert_eq!(ack["deletedCount"], 0);

    app.cleanup().await;
}
