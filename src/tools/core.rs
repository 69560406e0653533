//! Core payment tools (API-key authenticated, `api.juspay.in` / `sandbox.juspay.in`).

use serde_json::{json, Value};

use crate::schema::{FieldSpec, FieldType, ToolDescriptor};
use crate::schema::FieldError;
use crate::tools::{RequestParts, ToolSpec};
use crate::transport::HttpMethod;
use crate::{Error, Result};

const PAYMENT_METHOD_TYPES: [&str; 5] = ["CARD", "NB", "WALLET", "UPI", "EMI"];

fn routing_id() -> FieldSpec {
    FieldSpec::string("routing_id")
        .describe("Custom routing identifier. Defaults to the customer id, then the merchant id.")
}

fn with_routing(mut fields: Vec<FieldSpec>) -> Vec<FieldSpec> {
    fields.push(routing_id());
    fields
}

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            ToolDescriptor::new(
                "session_api_juspay",
                "Creates a new Juspay session for a given order.",
            )
            .with_fields(with_routing(vec![
                FieldSpec::string("order_id").required().describe("Unique order identifier."),
                FieldSpec::string("amount").required().describe("Order amount, e.g. '100.00'."),
                FieldSpec::string("customer_id").required(),
                FieldSpec::string("customer_email").required(),
                FieldSpec::string("customer_phone").required(),
                FieldSpec::string("payment_page_client_id").required(),
                FieldSpec::enumeration("action", ["paymentPage"]).with_default("paymentPage"),
                FieldSpec::string("return_url").required(),
                FieldSpec::string("currency").with_default("INR"),
                FieldSpec::string("description"),
                FieldSpec::string("first_name"),
                FieldSpec::string("last_name"),
            ]))
            .with_response_schema(json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string"},
                    "id": {"type": "string"},
                    "order_id": {"type": "string"},
                    "payment_links": {"type": "object"},
                    "sdk_payload": {"type": "object"}
                }
            })),
            HttpMethod::Post,
            "/session",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "order_status_api_juspay",
                "Retrieves the status of a specific Juspay order using its `order_id`.",
            )
            .with_fields(with_routing(vec![FieldSpec::string("order_id")
                .required()
                .in_path()
                .describe("Merchant order id to look up.")]))
            .with_response_schema(json!({
                "type": "object",
                "properties": {
                    "order_id": {"type": "string"},
                    "status": {"type": "string"},
                    "amount": {"type": "number"},
                    "currency": {"type": "string"},
                    "txn_id": {"type": "string"},
                    "refunds": {"type": "array"}
                }
            })),
            HttpMethod::Get,
            "/orders/{order_id}",
        ),
        ToolSpec::new(
            ToolDescriptor::new("create_order_juspay", "Creates a new order in Juspay payment system.")
                .with_fields(with_routing(vec![
                    FieldSpec::string("order_id").required(),
                    FieldSpec::string("amount").required(),
                    FieldSpec::string("currency").with_default("INR"),
                    FieldSpec::string("customer_id").required(),
                    FieldSpec::string("customer_email"),
                    FieldSpec::string("customer_phone"),
                    FieldSpec::string("description"),
                    FieldSpec::string("return_url"),
                    FieldSpec::object("metadata", vec![]),
                ])),
            HttpMethod::Post,
            "/orders",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "update_order_juspay",
                "Updates the amount or metadata of an existing order.",
            )
            .with_fields(with_routing(vec![
                FieldSpec::string("order_id").required().in_path(),
                FieldSpec::string("amount").required(),
                FieldSpec::object("metadata", vec![]),
            ])),
            HttpMethod::Post,
            "/orders/{order_id}",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "order_fulfillment_sync",
                "Updates the fulfillment status of an order after payment.",
            )
            .with_fields(with_routing(vec![
                FieldSpec::string("order_id").required().in_path(),
                FieldSpec::string("fulfillment_status").required(),
                FieldSpec::string("fulfillment_time").required().describe("ISO 8601 timestamp."),
                FieldSpec::string("fulfillment_id"),
                FieldSpec::string("fulfillment_command"),
            ])),
            HttpMethod::Post,
            "/orders/{order_id}/fulfillment",
        ),
        ToolSpec::new(
            ToolDescriptor::new("create_refund_juspay", "Initiates a refund for a charged order.")
                .with_fields(with_routing(vec![
                    FieldSpec::string("order_id").required().in_path(),
                    FieldSpec::string("unique_request_id")
                        .required()
                        .describe("Idempotency key for this refund."),
                    FieldSpec::string("amount").required(),
                ])),
            HttpMethod::Post,
            "/orders/{order_id}/refunds",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "create_txn_juspay",
                "Creates an order and processes payment in a single API call.",
            )
            .with_fields(with_routing(txn_fields(
                FieldType::enumeration(PAYMENT_METHOD_TYPES),
                true,
            ))),
            HttpMethod::Post,
            "/txns",
        )
        .with_mapper(map_txn),
        ToolSpec::new(
            ToolDescriptor::new(
                "create_moto_txn_juspay",
                "Creates an order with MOTO (mail order / telephone order) payment.",
            )
            .with_fields(with_routing({
                let mut fields = txn_fields(FieldType::enumeration(["CARD"]), false);
                fields.push(
                    FieldSpec::enumeration("auth_type", ["MOTO"])
                        .required()
                        .describe("Must be 'MOTO'."),
                );
                fields.push(FieldSpec::string("tavv"));
                fields
            })),
            HttpMethod::Post,
            "/txns",
        )
        .with_mapper(map_txn),
        ToolSpec::new(
            ToolDescriptor::new(
                "create_cash_txn_juspay",
                "Creates a CASH transaction for offline/cash-on-delivery payments.",
            )
            .with_fields(with_routing(vec![
                FieldSpec::string("order_id").required(),
                FieldSpec::string("merchant_id")
                    .describe("Defaults to the merchant id of the caller's credentials."),
                FieldSpec::boolean("redirect_after_payment").with_default(true),
                FieldSpec::enumeration("format", ["json"]).with_default("json"),
            ])),
            HttpMethod::Post,
            "/txns",
        )
        .with_mapper(map_cash_txn),
        ToolSpec::new(
            ToolDescriptor::new(
                "create_card_txn_juspay",
                "Creates a CARD transaction using a saved card token. Also requires \
                 `card_security_code` (CVV); prompt the user for it if missing.",
            )
            .with_fields(with_routing(vec![
                FieldSpec::string("order_id").required(),
                FieldSpec::string("card_token").required(),
                FieldSpec::string("merchant_id"),
                FieldSpec::string("payment_method_type").required(),
                FieldSpec::string("payment_method"),
                FieldSpec::string("card_number"),
                FieldSpec::string("name_on_card"),
                FieldSpec::string("card_exp_year"),
                FieldSpec::string("card_exp_month"),
                FieldSpec::string("card_security_code").required(),
                FieldSpec::boolean("save_to_locker"),
                FieldSpec::boolean("tokenize"),
                FieldSpec::boolean("redirect_after_payment"),
                FieldSpec::enumeration("format", ["json"]),
                FieldSpec::string("offers"),
            ])),
            HttpMethod::Post,
            "/txns",
        )
        .with_mapper(map_card_txn),
        ToolSpec::new(
            ToolDescriptor::new(
                "list_offers_juspay",
                "Lists available offers for a given order with optional coupon code.",
            )
            .with_fields(with_routing(vec![
                FieldSpec::object(
                    "order",
                    vec![
                        FieldSpec::string("order_id"),
                        FieldSpec::string("amount").required(),
                        FieldSpec::string("currency").with_default("INR"),
                    ],
                )
                .required(),
                FieldSpec::new(
                    "payment_method_info",
                    FieldType::array_of(FieldType::Object(vec![])),
                ),
                FieldSpec::object("customer", vec![]),
                FieldSpec::string("offer_code"),
            ])),
            HttpMethod::Post,
            "/v1/offers/list",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "get_saved_payment_methods",
                "Retrieves a customer's saved payment methods.",
            )
            .with_fields(with_routing(vec![FieldSpec::string("customer_id")
                .required()
                .in_path()])),
            HttpMethod::Get,
            "/customers/{customer_id}/payment_methods",
        ),
        ToolSpec::new(
            ToolDescriptor::new("get_customer_juspay", "Retrieves a customer by id.")
                .with_fields(with_routing(vec![
                    FieldSpec::string("customer_id").required().in_path(),
                    FieldSpec::boolean("options.get_client_auth_token").in_query(),
                ])),
            HttpMethod::Get,
            "/customers/{customer_id}",
        ),
        ToolSpec::new(
            ToolDescriptor::new("create_customer_juspay", "Creates a new customer.")
                .with_fields(with_routing(vec![
                    FieldSpec::string("object_reference_id").required(),
                    FieldSpec::string("mobile_number").required(),
                    FieldSpec::string("email_address").required(),
                    FieldSpec::string("first_name"),
                    FieldSpec::string("last_name"),
                    FieldSpec::string("mobile_country_code"),
                    FieldSpec::boolean("options.get_client_auth_token"),
                ])),
            HttpMethod::Post,
            "/customers",
        ),
        ToolSpec::new(
            ToolDescriptor::new("list_cards_juspay", "Lists the saved cards of a customer.")
                .with_fields(with_routing(vec![
                    FieldSpec::string("customer_id").required().in_query(),
                    FieldSpec::boolean("options.check_cvv_less_support").in_query(),
                ])),
            HttpMethod::Get,
            "/cards",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "get_card_info_juspay",
                "Returns issuer, brand and type for a card BIN.",
            )
            .with_fields(with_routing(vec![FieldSpec::string("bin")
                .required()
                .in_path()
                .describe("First 6 to 9 digits of the card number.")])),
            HttpMethod::Get,
            "/cardbins/{bin}",
        ),
        ToolSpec::new(
            ToolDescriptor::new("verify_vpa_juspay", "Verifies a UPI virtual payment address.")
                .with_fields(with_routing(vec![
                    FieldSpec::string("vpa").required(),
                    FieldSpec::string("merchant_id"),
                    FieldSpec::string("customer_id"),
                ])),
            HttpMethod::Post,
            "/v2/upi/verify-vpa",
        )
        .with_mapper(map_merchant_default),
        ToolSpec::new(
            ToolDescriptor::new("list_wallets_juspay", "Lists the wallets linked to a customer.")
                .with_fields(with_routing(vec![FieldSpec::string("customer_id")
                    .required()
                    .in_path()])),
            HttpMethod::Get,
            "/customers/{customer_id}/wallets",
        ),
    ]
}

fn txn_fields(payment_method_type: FieldType, allow_card_details: bool) -> Vec<FieldSpec> {
    let mut fields = vec![
        FieldSpec::string("order.order_id")
            .required()
            .describe("Unique identifier for the order (max 21 alphanumeric chars)."),
        FieldSpec::string("order.amount").required(),
        FieldSpec::string("order.currency").required(),
        FieldSpec::string("order.customer_id").required(),
        FieldSpec::string("order.customer_email"),
        FieldSpec::string("order.customer_phone"),
        FieldSpec::string("order.return_url").required(),
        FieldSpec::string("merchant_id").required(),
        FieldSpec::new("payment_method_type", payment_method_type).required(),
        FieldSpec::string("payment_method"),
        FieldSpec::string("card_number"),
        FieldSpec::string("card_exp_month"),
        FieldSpec::string("card_exp_year"),
        FieldSpec::boolean("redirect_after_payment"),
        FieldSpec::enumeration("format", ["json"]),
    ];
    if allow_card_details {
        fields.push(FieldSpec::string("name_on_card"));
        fields.push(FieldSpec::string("card_security_code"));
        fields.push(FieldSpec::boolean("save_to_locker"));
    }
    fields
}

fn take_body(parts: &mut RequestParts<'_>) -> serde_json::Map<String, Value> {
    std::mem::take(&mut parts.args)
}

/// Fill `merchant_id` from the resolved credentials when absent.
fn merchant_id_or_credential(
    parts: &RequestParts<'_>,
    body: &serde_json::Map<String, Value>,
) -> Result<String> {
    body.get("merchant_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| parts.credentials.merchant_id.clone())
        .ok_or_else(|| {
            Error::validation(
                "merchant_id must be provided in arguments or credentials",
                vec![FieldError::with_path("required field is missing", "merchant_id")],
            )
        })
}

fn map_txn(parts: &mut RequestParts<'_>) -> Result<Value> {
    let mut body = take_body(parts);
    body.entry("format").or_insert_with(|| json!("json"));
    Ok(Value::Object(body))
}

fn map_cash_txn(parts: &mut RequestParts<'_>) -> Result<Value> {
    let mut body = take_body(parts);
    let merchant_id = merchant_id_or_credential(parts, &body)?;
    body.insert("merchant_id".into(), json!(merchant_id));
    body.insert("payment_method_type".into(), json!("CASH"));
    body.insert("payment_method".into(), json!("CASH"));
    body.entry("redirect_after_payment").or_insert(json!(true));
    body.entry("format").or_insert_with(|| json!("json"));
    Ok(Value::Object(body))
}

fn map_card_txn(parts: &mut RequestParts<'_>) -> Result<Value> {
    let mut body = take_body(parts);
    let merchant_id = merchant_id_or_credential(parts, &body)?;
    body.insert("merchant_id".into(), json!(merchant_id));

    // the /txns endpoint takes these flags as "true"/"false" strings
    for flag in ["save_to_locker", "tokenize", "redirect_after_payment"] {
        let rendered = match body.get(flag) {
            Some(Value::Bool(false)) => "false",
            _ => "true",
        };
        body.insert(flag.to_string(), json!(rendered));
    }
    body.entry("format").or_insert_with(|| json!("json"));
    Ok(Value::Object(body))
}

fn map_merchant_default(parts: &mut RequestParts<'_>) -> Result<Value> {
    let mut body = take_body(parts);
    if !body.contains_key("merchant_id") {
        if let Some(merchant_id) = &parts.credentials.merchant_id {
            body.insert("merchant_id".into(), json!(merchant_id));
        }
    }
    Ok(Value::Object(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, Secret};
    use crate::config::Environment;
    use crate::schema::ArgumentValidator;
    use url::Url;

    fn spec(name: &str) -> ToolSpec {
        tools()
            .into_iter()
            .find(|t| t.name() == name)
            .unwrap()
    }

    fn credentials(merchant: Option<&str>) -> Credentials {
        Credentials {
            secret: Secret::ApiKey("key".into()),
            merchant_id: merchant.map(str::to_string),
            environment: Environment::Sandbox,
        }
    }

    fn build(name: &str, args: Value, merchant: Option<&str>) -> Result<crate::transport::OutboundRequest> {
        let spec = spec(name);
        let validated = ArgumentValidator::lenient()
            .validate(&spec.descriptor.fields, &args)
            .map_err(|e| Error::validation("invalid", e))?;
        spec.build_request(
            &Url::parse("https://sandbox.juspay.in").unwrap(),
            validated,
            &credentials(merchant),
            "mcp-tool-000000000000",
        )
    }

    #[test]
    fn test_order_status_request() {
        let req = build("order_status_api_juspay", json!({"order_id": "ORD123"}), Some("M1")).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://sandbox.juspay.in/orders/ORD123");
        assert!(req.body.is_none());
        assert_eq!(req.header_value("x-merchantid"), Some("M1"));
    }

    #[test]
    fn test_create_txn_defaults_format_and_routes_by_customer() {
        let req = build(
            "create_txn_juspay",
            json!({
                "order.order_id": "O1",
                "order.amount": "10.00",
                "order.currency": "INR",
                "order.customer_id": "cust_1",
                "order.return_url": "https://shop.example/return",
                "merchant_id": "M1",
                "payment_method_type": "UPI"
            }),
            Some("M1"),
        )
        .unwrap();
        let body = req.body.clone().unwrap();
        assert_eq!(body["format"], "json");
        assert_eq!(body["order.order_id"], "O1");
        assert_eq!(req.header_value("x-routing-id"), Some("cust_1"));
    }

    #[test]
    fn test_cash_txn_forces_cash_and_falls_back_to_credential_merchant() {
        let req = build(
            "create_cash_txn_juspay",
            json!({"order_id": "O1", "payment_method": "CARD"}),
            Some("M9"),
        )
        .unwrap();
        let body = req.body.unwrap();
        assert_eq!(body["payment_method_type"], "CASH");
        assert_eq!(body["payment_method"], "CASH");
        assert_eq!(body["merchant_id"], "M9");
        assert_eq!(body["redirect_after_payment"], true);
        assert_eq!(body["format"], "json");

        let err = build("create_cash_txn_juspay", json!({"order_id": "O1"}), None).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_card_txn_renders_flags_as_strings() {
        let req = build(
            "create_card_txn_juspay",
            json!({
                "order_id": "O1",
                "card_token": "tok_1",
                "payment_method_type": "CARD",
                "card_security_code": "123",
                "tokenize": false
            }),
            Some("M1"),
        )
        .unwrap();
        let body = req.body.unwrap();
        assert_eq!(body["save_to_locker"], "true");
        assert_eq!(body["tokenize"], "false");
        assert_eq!(body["redirect_after_payment"], "true");
    }

    #[test]
    fn test_card_txn_requires_cvv() {
        let spec = spec("create_card_txn_juspay");
        let errors = ArgumentValidator::lenient()
            .validate(
                &spec.descriptor.fields,
                &json!({"order_id": "O1", "card_token": "t", "payment_method_type": "CARD"}),
            )
            .unwrap_err();
        assert_eq!(errors[0].path.as_deref(), Some("card_security_code"));
    }

    #[test]
    fn test_moto_requires_auth_type() {
        let spec = spec("create_moto_txn_juspay");
        let errors = ArgumentValidator::lenient()
            .validate(
                &spec.descriptor.fields,
                &json!({
                    "order.order_id": "O1",
                    "order.amount": "1",
                    "order.currency": "INR",
                    "order.customer_id": "c",
                    "order.return_url": "https://r",
                    "merchant_id": "M1",
                    "payment_method_type": "CARD",
                    "auth_type": "OTP"
                }),
            )
            .unwrap_err();
        assert_eq!(errors[0].path.as_deref(), Some("auth_type"));
    }

    #[test]
    fn test_list_cards_uses_query() {
        let req = build("list_cards_juspay", json!({"customer_id": "cust_1"}), Some("M1")).unwrap();
        assert_eq!(req.url, "https://sandbox.juspay.in/cards");
        assert_eq!(req.query, vec![("customer_id".to_string(), "cust_1".to_string())]);
        assert!(req.body.is_none());
        assert_eq!(req.header_value("x-routing-id"), Some("cust_1"));
    }
}
