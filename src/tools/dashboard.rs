//! Merchant dashboard tools (login-token authenticated, `portal.juspay.in`).
//!
//! Every dashboard tool accepts `tenant_id`, `cookie` and `x-source-id` arguments which are
//! forwarded as outbound headers instead of body fields. Time ranges given in IST are
//! converted to UTC before they reach the portal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::schema::{FieldError, FieldSpec, FieldType, ToolDescriptor};
use crate::tools::time::{ist_to_utc, unix_seconds};
use crate::tools::{RequestParts, ToolSpec, Upstream};
use crate::transport::HttpMethod;
use crate::{Error, Result};

const PAYOUT_HEADERS: &[(&str, &str)] = &[("x-token-type", "Euler")];
const X_MID_HEADERS: &[(&str, &str)] = &[("x-feature", "canary_i")];

const FILTER_CONDITIONS: [&str; 6] = [
    "In",
    "NotIn",
    "Greater",
    "GreaterThanEqual",
    "LessThanEqual",
    "Less",
];

static LOGIC_OPERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+(AND|OR)\s+").unwrap());
static CLAUSE_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

fn with_headers(mut fields: Vec<FieldSpec>) -> Vec<FieldSpec> {
    fields.push(
        FieldSpec::string("tenant_id")
            .in_header("x-tenant-id")
            .describe("Tenant id forwarded as the x-tenant-id header."),
    );
    fields.push(FieldSpec::string("cookie").in_header("cookie"));
    fields.push(
        FieldSpec::string("x-source-id")
            .in_header("x-source-id")
            .describe("Caller identifier. Defaults to 'juspay-mcp'."),
    );
    fields
}

const ALERT_COLUMNS: [&str; 9] = [
    "name",
    "dimensions",
    "merchant_id",
    "current_metric",
    "expected_metric",
    "start_time",
    "metadata_alert_details",
    "metadata_info",
    "recovered_ts",
];

fn time_field(name: &str, what: &str) -> FieldSpec {
    FieldSpec::string(name)
        .required()
        .describe(format!("{} in IST, format YYYY-MM-DDTHH:MM:SSZ.", what))
}

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_find_orders",
                "Searches orders created within a time range, with optional flat filters \
                 (clauses plus index logic such as '0 AND (1 OR 2)'). Use domain 'txnsELS' \
                 unless every filter belongs to the orders domain.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("dateFrom")
                    .required()
                    .describe("Start, ISO 8601 (YYYY-MM-DDTHH:MM:SSZ)."),
                FieldSpec::string("dateTo")
                    .required()
                    .describe("End, ISO 8601 (YYYY-MM-DDTHH:MM:SSZ)."),
                FieldSpec::integer("offset").with_default(0),
                FieldSpec::object(
                    "flatFilters",
                    vec![
                        FieldSpec::new(
                            "clauses",
                            FieldType::array_of(FieldType::Object(vec![])),
                        )
                        .required()
                        .describe("Predicates of the form {field, condition, val}."),
                        FieldSpec::string("logic")
                            .required()
                            .describe("Expression over clause indices, e.g. '0 AND 1'."),
                    ],
                ),
                FieldSpec::enumeration("domain", ["txnsELS", "ordersELS"]).with_default("txnsELS"),
            ])),
            HttpMethod::Post,
            "/ec/v4/orders",
        )
        .with_mapper(map_find_orders),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_order_details",
                "Returns complete details for a single order id.",
            )
            .with_fields(with_headers(vec![FieldSpec::string("order_id")
                .required()
                .in_path()])),
            HttpMethod::Post,
            "/api/ec/v1/orders/{order_id}",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_list_payment_links_v1",
                "Lists payment links created within a time range.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::object("qFilters", vec![]),
                time_field("date_from", "Start"),
                time_field("date_to", "End"),
                FieldSpec::integer("offset"),
            ])),
            HttpMethod::Post,
            "/api/ec/v1/paymentLinks/list",
        )
        .with_mapper(map_payment_links),
        ToolSpec::new(
            ToolDescriptor::new(
                "list_outages_juspay",
                "Lists payment method outages within a time range.",
            )
            .with_fields(with_headers(vec![
                time_field("startTime", "Start"),
                time_field("endTime", "End"),
                FieldSpec::string("merchantId"),
            ])),
            HttpMethod::Post,
            "/api/ec/v1/outage/list",
        )
        .with_mapper(map_outages),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_list_emi_plans",
                "Lists EMI plans configured for the merchant. All filters are optional.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("emiType").describe("Standard_EMI, NO_COST or LOW_COST."),
                FieldSpec::string("gateway"),
                FieldSpec::string("bankCode"),
                FieldSpec::integer("tenure"),
                FieldSpec::string("cardType").describe("CREDIT or DEBIT."),
                FieldSpec::integer("offset"),
                FieldSpec::integer("limit"),
                FieldSpec::boolean("disabled"),
            ])),
            HttpMethod::Post,
            "/ec/v1/emiPlans/list",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_integration_monitoring_status",
                "Returns integration status per stage for a platform and product. Backend \
                 uses the platform-agnostic API; Web, Android and IOS the platform-specific one.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::enumeration("platform", ["Backend", "Web", "Android", "IOS"]).required(),
                FieldSpec::enumeration(
                    "product_integrated",
                    [
                        "Payment Page Signature",
                        "Payment Page Session",
                        "EC + SDK",
                        "EC Only",
                    ],
                )
                .required(),
                FieldSpec::string("merchant_id").required(),
                FieldSpec::string("start_time").required(),
                FieldSpec::string("end_time").required(),
            ])),
            HttpMethod::Post,
            "/{ic_prefix}/integration-monitoring/v1/{integration_kind}/status",
        )
        .with_mapper(map_integration_status),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_x_mid_monitoring",
                "Reports whether x-merchantid is passed on each API call of a merchant.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("merchant_id").required(),
                FieldSpec::string("start_time").required(),
                FieldSpec::string("end_time").required(),
            ])),
            HttpMethod::Post,
            "/{ic_prefix}/integration-monitoring/v1/xmerchant/metrics",
        )
        .with_static_headers(X_MID_HEADERS)
        .with_mapper(map_x_mid_monitoring),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_list_payout_orders",
                "Lists payout orders created within a time range.",
            )
            .with_fields(with_headers(vec![
                time_field("dateFrom", "Start"),
                time_field("dateTo", "End"),
                FieldSpec::integer("limit").with_default(100),
                FieldSpec::integer("offset").with_default(0),
            ])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/orders",
        )
        .with_static_headers(PAYOUT_HEADERS)
        .with_mapper(map_payout_orders),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_order_details",
                "Returns a payout order with its fulfillments. Fulfillment ids (`-f1`) and \
                 transaction ids (`-f1-t1`) share the order id as prefix.",
            )
            .with_fields(with_headers(vec![FieldSpec::string("order_id")
                .required()
                .in_path()])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/orders/{order_id}",
        )
        .with_static_headers(PAYOUT_HEADERS)
        .with_mapper(map_payout_order_details),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_list_beneficiaries",
                "Lists beneficiaries registered under a customer id.",
            )
            .with_fields(with_headers(vec![FieldSpec::string("customerId")
                .required()
                .in_path()])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v2/benedetails/{customerId}",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_beneficiary_details",
                "Returns one beneficiary of a customer.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("customerId").required().in_path(),
                FieldSpec::string("beneId").required().in_path(),
            ])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v2/benedetails/{customerId}/{beneId}",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_config",
                "Returns the payout configuration of the merchant account.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/config",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_keys",
                "Returns the encryption and SSL keys used for payouts.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/keys",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_list_payout_outages",
                "Lists current payout outages and maintenance windows.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/listOutage",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_list_configured_payout_gateways",
                "Lists payout gateway credentials configured for the merchant, with reference \
                 ids and setup status. Payout gateways only, not payment gateways.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/gatewaycredential",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_gateways",
                "Lists every payout gateway type that can be configured, with its schema.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/gateway",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_gateway_details",
                "Returns the configured credential of one payout gateway and rail.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("gateway")
                    .required()
                    .in_path()
                    .describe("Gateway identifier, e.g. 'RAZORPAY' or 'PAYU'."),
                FieldSpec::string("rail")
                    .required()
                    .in_path()
                    .describe("Rail of the gateway configuration."),
            ])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/gatewaycredential/{gateway}/{rail}",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_active_payout_gateways",
                "Lists payout methods currently active under the merchant's priority logic.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/dashboard/v1/prioritylogic/activemethods",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_priority_logics",
                "Returns the payout routing rules and gateway priorities.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/prioritylogic",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_weblabs",
                "Returns payout WebLab settings: feature flags and experiment configuration.",
            )
            .with_fields(with_headers(vec![])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/weblabConfig",
        )
        .with_static_headers(PAYOUT_HEADERS),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_get_payout_balance",
                "Returns balances held at each configured payout gateway. Set isForce to \
                 'true' to refresh from the gateways instead of the cache.",
            )
            .with_fields(with_headers(vec![FieldSpec::enumeration(
                "isForce",
                ["true", "false"],
            )
            .with_default("false")])),
            HttpMethod::Get,
            "/api/payout/batch/dashboard/v1/getways/balance",
        )
        .with_static_headers(PAYOUT_HEADERS)
        .with_mapper(map_payout_balance),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_list_unified_alerts",
                "Lists alerts raised for a merchant, optionally filtered by alert name and \
                 dimensions (e.g. {\"api\": \"TRANSACTION\"}). Each alert is returned as one \
                 object.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("merchantId").required(),
                FieldSpec::string("startTime").describe("Start, format 'YYYY-MM-DD HH:MM:SS'."),
                FieldSpec::string("endTime").describe("End, format 'YYYY-MM-DD HH:MM:SS'."),
                FieldSpec::string("name").describe("Alert name, e.g. 'Api Availability Drop'."),
                FieldSpec::object("dimensions", vec![]),
            ])),
            HttpMethod::Post,
            "/getExternalAlerts",
        )
        .with_upstream(Upstream::Alerts)
        .with_mapper(map_unified_alerts)
        .with_response_mapper(columns_to_rows),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_fetch_feature_details",
                "Describes one feature: overview, FAQs, adoption by other merchants and \
                 supported gateways, payment method types and platforms.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("merchant_id").required(),
                FieldSpec::string("feature_id").required(),
                FieldSpec::string("client_id"),
            ])),
            HttpMethod::Post,
            "/stein/feature-description/fetch",
        ),
        ToolSpec::new(
            ToolDescriptor::new(
                "juspay_fetch_feature_list",
                "Lists marketplace features available to the merchant.",
            )
            .with_fields(with_headers(vec![
                FieldSpec::string("merchant_id").required(),
                FieldSpec::string("client_id"),
            ])),
            HttpMethod::Post,
            "/stein/feature-list/fetch",
        )
        .with_mapper(map_feature_list),
    ]
}

fn map_find_orders(parts: &mut RequestParts<'_>) -> Result<Value> {
    let date_from = parts.require_str("dateFrom")?;
    let date_to = parts.require_str("dateTo")?;
    let offset = parts.take("offset").unwrap_or_else(|| json!(0));
    let domain = parts
        .take_str("domain")
        .unwrap_or_else(|| "txnsELS".to_string());

    let from_ts = unix_seconds("dateFrom", &date_from)?.to_string();
    let to_ts = unix_seconds("dateTo", &date_to)?.to_string();
    let time_dimension = if domain == "ordersELS" {
        "order_created_at"
    } else {
        "date_created"
    };

    let q_filters = match parts.take("flatFilters") {
        Some(Value::Object(flat)) => {
            let mut clauses = vec![
                clause(time_dimension, "GreaterThanEqual", json!(from_ts)),
                clause(time_dimension, "LessThanEqual", json!(to_ts)),
            ];
            if let Some(Value::Array(items)) = flat.get("clauses") {
                clauses.extend(items.iter().cloned());
            }
            let logic = flat.get("logic").and_then(Value::as_str).unwrap_or("");
            let shifted = CLAUSE_INDEX.replace_all(logic, |caps: &regex::Captures<'_>| {
                caps[0]
                    .parse::<usize>()
                    .map(|i| (i + 2).to_string())
                    .unwrap_or_else(|_| caps[0].to_string())
            });
            flat_filter_to_tree(&clauses, &format!("0 AND 1 AND ({})", shifted))?
        }
        _ => json!({
            "and": {
                "left": clause(time_dimension, "GreaterThanEqual", json!(from_ts)),
                "right": clause(time_dimension, "LessThanEqual", json!(to_ts)),
            }
        }),
    };

    Ok(json!({
        "offset": offset,
        "filters": {"dateCreated": {"lte": date_to, "gte": date_from}},
        "order": [["date_created", "DESC"]],
        "qFilters": q_filters,
        "domain": domain,
        "sortDimension": "order_created_at",
    }))
}

fn clause(field: &str, condition: &str, val: Value) -> Value {
    json!({"field": field, "condition": condition, "val": val})
}

/// Fold a flat clause list and its index logic into the portal's nested and/or tree.
///
/// Operators are applied left to right; parentheses in `logic` only group indices and do
/// not change evaluation order.
pub fn flat_filter_to_tree(clauses: &[Value], logic: &str) -> Result<Value> {
    let mut operands = Vec::new();
    let mut operators = Vec::new();
    let mut last = 0;
    for m in LOGIC_OPERATOR.captures_iter(logic) {
        let (Some(whole), Some(op)) = (m.get(0), m.get(1)) else {
            continue;
        };
        operands.push(&logic[last..whole.start()]);
        operators.push(op.as_str().to_ascii_lowercase());
        last = whole.end();
    }
    operands.push(&logic[last..]);

    let indices = operands
        .iter()
        .map(|tok| {
            let tok = tok.trim().trim_matches(|c| c == '(' || c == ')').trim();
            tok.parse::<usize>()
                .ok()
                .filter(|&i| i < clauses.len())
                .ok_or_else(|| {
                    logic_error(format!("'{}' does not reference one of {} clauses", tok, clauses.len()))
                })
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut tree = normalize_clause(&clauses[indices[0]])?;
    for (op, &idx) in operators.iter().zip(indices.iter().skip(1)) {
        let right = normalize_clause(&clauses[idx])?;
        let mut node = Map::new();
        node.insert(op.clone(), json!({ "left": tree, "right": right }));
        tree = Value::Object(node);
    }
    Ok(tree)
}

fn normalize_clause(raw: &Value) -> Result<Value> {
    let obj = raw
        .as_object()
        .ok_or_else(|| logic_error("each clause must be an object"))?;
    let field = obj
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| logic_error("clause is missing 'field'"))?;
    let condition = obj
        .get("condition")
        .and_then(Value::as_str)
        .ok_or_else(|| logic_error("clause is missing 'condition'"))?;
    if !FILTER_CONDITIONS.contains(&condition) {
        return Err(logic_error(format!(
            "condition '{}' is not one of [{}]",
            condition,
            FILTER_CONDITIONS.join(", ")
        )));
    }
    Ok(clause(field, condition, obj.get("val").cloned().unwrap_or(Value::Null)))
}

fn logic_error(message: impl Into<String>) -> Error {
    Error::validation(
        "invalid flatFilters",
        vec![FieldError::with_path(message, "flatFilters")],
    )
}

fn map_payment_links(parts: &mut RequestParts<'_>) -> Result<Value> {
    let date_from = ist_to_utc("date_from", &parts.require_str("date_from")?)?;
    let date_to = ist_to_utc("date_to", &parts.require_str("date_to")?)?;

    let mut body = Map::new();
    body.insert(
        "qFilters".into(),
        parts.take("qFilters").unwrap_or_else(|| {
            json!({"field": "order_source_object", "condition": "Equals", "val": "PAYMENT_LINK"})
        }),
    );
    if let Some(offset) = parts.take("offset") {
        body.insert("offset".into(), offset);
    }
    body.insert(
        "filters".into(),
        json!({"dateCreated": {"gte": date_from, "lte": date_to}}),
    );
    Ok(Value::Object(body))
}

fn map_outages(parts: &mut RequestParts<'_>) -> Result<Value> {
    let start = ist_to_utc("startTime", &parts.require_str("startTime")?)?;
    let end = ist_to_utc("endTime", &parts.require_str("endTime")?)?;
    let mut body = json!({"startTime": start, "endTime": end});
    if let Some(merchant_id) = parts.take_str("merchantId") {
        body["merchantId"] = json!(merchant_id);
    }
    Ok(body)
}

fn ic_prefix(parts: &RequestParts<'_>) -> &'static str {
    if parts.credentials.environment.is_production() {
        "ic-api"
    } else {
        "ic"
    }
}

fn map_integration_status(parts: &mut RequestParts<'_>) -> Result<Value> {
    let platform = parts.require_str("platform")?;
    let product = parts.require_str("product_integrated")?;
    let merchant_id = parts.require_str("merchant_id")?;
    let start = parts.require_str("start_time")?;
    let end = parts.require_str("end_time")?;
    let backend = platform == "Backend";

    let prefix = ic_prefix(parts);
    parts.path_params.insert("ic_prefix".into(), prefix.into());
    parts.path_params.insert(
        "integration_kind".into(),
        if backend { "agnostic" } else { "nonagnostic" }.into(),
    );

    let mut filters = json!({
        "merchant_id": [merchant_id],
        "product_integrated": [product],
    });
    if !backend {
        filters["platform"] = json!([platform]);
    }

    Ok(json!({
        "timeRange": {"startTime": start, "endTime": end},
        "groupByNames": ["stage"],
        "filters": filters,
        "source": "REALTIME",
        "metrics": ["status"],
        "innerSelect": ["stage", "success_total", "total", "min_hits", "no_of_states"],
        "secondInnerSelect": [
            "stage", "success_total", "total", "time_bucket",
            "merchant_id", "product_integrated", "platform"
        ],
    }))
}

fn map_x_mid_monitoring(parts: &mut RequestParts<'_>) -> Result<Value> {
    let merchant_id = parts.require_str("merchant_id")?;
    let start = parts.require_str("start_time")?;
    let end = parts.require_str("end_time")?;
    let prefix = ic_prefix(parts);
    parts.path_params.insert("ic_prefix".into(), prefix.into());

    Ok(json!([{
        "timeRange": {"startTime": start, "endTime": end},
        "groupByNames": ["api_shortcode"],
        "filters": {"merchant_id": [merchant_id], "status_code": [200]},
        "source": "REALTIME",
        "metrics": ["validate_xmid"],
    }]))
}

fn map_payout_orders(parts: &mut RequestParts<'_>) -> Result<Value> {
    let from = ist_to_utc("dateFrom", &parts.require_str("dateFrom")?)?;
    let to = ist_to_utc("dateTo", &parts.require_str("dateTo")?)?;
    let limit = parts.take_str("limit").unwrap_or_else(|| "100".into());
    let offset = parts.take_str("offset").unwrap_or_else(|| "0".into());

    parts.query.push(("createdAt.gte".into(), from));
    parts.query.push(("createdAt.lte".into(), to));
    parts.query.push(("limit".into(), limit));
    parts.query.push(("offset".into(), offset));
    Ok(Value::Null)
}

fn map_payout_order_details(parts: &mut RequestParts<'_>) -> Result<Value> {
    parts.query.push(("expand".into(), "fulfillment".into()));
    Ok(Value::Null)
}

fn map_payout_balance(parts: &mut RequestParts<'_>) -> Result<Value> {
    let force = parts.take_str("isForce").unwrap_or_else(|| "false".into());
    parts.query.push(("force".into(), force));
    Ok(Value::Null)
}

fn map_unified_alerts(parts: &mut RequestParts<'_>) -> Result<Value> {
    let merchant_id = parts.require_str("merchantId")?;
    let token = parts.credentials.web_login_token().map(str::to_string);
    if let Some(token) = token {
        parts.headers.push(("token".into(), token));
    }

    let mut body = json!({
        "is_visible": true,
        "full_info": true,
        "with_config": true,
        "merchant_id": merchant_id,
        "select_columns": ALERT_COLUMNS,
    });
    if let Some(dimensions) = parts.take("dimensions").filter(|d| !is_empty_value(d)) {
        body["dimensions"] = dimensions;
    }
    if let Some(name) = parts.take_str("name").filter(|n| !n.is_empty()) {
        body["name"] = json!(name);
    }

    let mut range = Map::new();
    if let Some(start) = parts.take_str("startTime").filter(|s| !s.is_empty()) {
        range.insert("start".into(), json!(start));
    }
    if let Some(end) = parts.take_str("endTime").filter(|s| !s.is_empty()) {
        range.insert("end".into(), json!(end));
    }
    if !range.is_empty() {
        body["ts_alert"] = Value::Object(range);
    }
    Ok(body)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Turn a column-oriented object (`{"name": [a, b], "merchant_id": [m, n]}`) into one
/// object per row. Short columns yield `null`; anything not column-shaped passes through.
pub fn columns_to_rows(payload: Value) -> Value {
    let columns = match payload {
        Value::Object(map) => map,
        Value::Array(_) => return payload,
        other => return Value::Array(vec![other]),
    };
    let rows = match columns.values().next() {
        None => return Value::Array(Vec::new()),
        Some(Value::Array(first)) => first.len(),
        Some(_) => return Value::Array(vec![Value::Object(columns)]),
    };

    (0..rows)
        .map(|i| {
            columns
                .iter()
                .map(|(key, column)| {
                    let cell = column
                        .as_array()
                        .and_then(|values| values.get(i))
                        .cloned()
                        .unwrap_or(Value::Null);
                    (key.clone(), cell)
                })
                .collect::<Map<String, Value>>()
        })
        .map(Value::Object)
        .collect()
}

fn map_feature_list(parts: &mut RequestParts<'_>) -> Result<Value> {
    let merchant_id = parts.require_str("merchant_id")?;
    let client_id = parts.take_str("client_id");
    Ok(json!({"merchant_id": merchant_id, "client_id": client_id}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, Secret};
    use crate::config::Environment;
    use crate::schema::ArgumentValidator;
    use crate::transport::OutboundRequest;
    use url::Url;

    fn build(name: &str, args: Value, environment: Environment) -> Result<OutboundRequest> {
        let spec = tools().into_iter().find(|t| t.name() == name).unwrap();
        let validated = ArgumentValidator::lenient()
            .validate(&spec.descriptor.fields, &args)
            .map_err(|e| Error::validation("invalid", e))?;
        let credentials = Credentials {
            secret: Secret::WebLoginToken("tok".into()),
            merchant_id: None,
            environment,
        };
        spec.build_request(
            &Url::parse("https://portal.juspay.in").unwrap(),
            validated,
            &credentials,
            "mcp-tool-000000000000",
        )
    }

    #[test]
    fn test_payment_links_defaults_and_ist_conversion() {
        let req = build(
            "juspay_list_payment_links_v1",
            json!({"date_from": "2025-05-22T00:00:00Z", "date_to": "2025-05-22T23:59:00Z"}),
            Environment::Production,
        )
        .unwrap();
        let body = req.body.unwrap();
        assert_eq!(body["qFilters"]["val"], "PAYMENT_LINK");
        assert_eq!(body["filters"]["dateCreated"]["gte"], "2025-05-21T18:30:00Z");
        assert_eq!(body["filters"]["dateCreated"]["lte"], "2025-05-22T18:29:59Z");
        assert!(body.get("offset").is_none());
    }

    #[test]
    fn test_outages_body() {
        let req = build(
            "list_outages_juspay",
            json!({"startTime": "2025-05-23T10:30:00Z", "endTime": "2025-05-23T12:00:00Z", "merchantId": "m1"}),
            Environment::Production,
        )
        .unwrap();
        assert_eq!(req.url, "https://portal.juspay.in/api/ec/v1/outage/list");
        assert_eq!(
            req.body.unwrap(),
            json!({"startTime": "2025-05-23T05:00:00Z", "endTime": "2025-05-23T06:30:00Z", "merchantId": "m1"})
        );
    }

    #[test]
    fn test_header_arguments_leave_the_body() {
        let req = build(
            "juspay_get_order_details",
            json!({"order_id": "ord_1", "tenant_id": "t1", "x-source-id": "agent"}),
            Environment::Production,
        )
        .unwrap();
        assert_eq!(req.url, "https://portal.juspay.in/api/ec/v1/orders/ord_1");
        assert_eq!(req.body, Some(json!({})));
        assert_eq!(req.header_value("x-tenant-id"), Some("t1"));
        assert_eq!(req.header_value("x-source-id"), Some("agent"));
        assert_eq!(req.header_value("x-web-logintoken"), Some("tok"));
    }

    #[test]
    fn test_integration_monitoring_paths() {
        let args = json!({
            "platform": "Backend",
            "product_integrated": "EC Only",
            "merchant_id": "m1",
            "start_time": "2025-08-03T00:00:00Z",
            "end_time": "2025-09-01T12:50:00Z"
        });
        let req = build("juspay_integration_monitoring_status", args.clone(), Environment::Production).unwrap();
        assert_eq!(
            req.url,
            "https://portal.juspay.in/ic-api/integration-monitoring/v1/agnostic/status"
        );
        assert!(req.body.as_ref().unwrap()["filters"].get("platform").is_none());

        let mut web = args;
        web["platform"] = json!("Web");
        let req = build("juspay_integration_monitoring_status", web, Environment::Sandbox).unwrap();
        assert_eq!(
            req.url,
            "https://portal.juspay.in/ic/integration-monitoring/v1/nonagnostic/status"
        );
        assert_eq!(req.body.unwrap()["filters"]["platform"], json!(["Web"]));
    }

    #[test]
    fn test_payout_orders_query() {
        let req = build(
            "juspay_list_payout_orders",
            json!({"dateFrom": "2025-03-28T14:16:00Z", "dateTo": "2025-03-28T15:16:00Z"}),
            Environment::Production,
        )
        .unwrap();
        assert!(req.body.is_none());
        assert_eq!(req.header_value("x-token-type"), Some("Euler"));
        assert_eq!(
            req.query,
            vec![
                ("createdAt.gte".to_string(), "2025-03-28T08:46:00Z".to_string()),
                ("createdAt.lte".to_string(), "2025-03-28T09:46:00Z".to_string()),
                ("limit".to_string(), "100".to_string()),
                ("offset".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_find_orders_default_filters() {
        let req = build(
            "juspay_find_orders",
            json!({"dateFrom": "2025-04-15T18:30:00Z", "dateTo": "2025-04-16T15:06:00Z"}),
            Environment::Production,
        )
        .unwrap();
        let body = req.body.unwrap();
        assert_eq!(body["domain"], "txnsELS");
        assert_eq!(body["offset"], 0);
        assert_eq!(body["order"], json!([["date_created", "DESC"]]));
        assert_eq!(body["qFilters"]["and"]["left"]["field"], "date_created");
        assert_eq!(body["qFilters"]["and"]["left"]["val"], "1744741800");
    }

    #[test]
    fn test_flat_filters_are_folded_after_time_clauses() {
        let req = build(
            "juspay_find_orders",
            json!({
                "dateFrom": "2025-04-15T18:30:00Z",
                "dateTo": "2025-04-16T15:06:00Z",
                "domain": "ordersELS",
                "flatFilters": {
                    "clauses": [
                        {"field": "order_status", "condition": "In", "val": ["CHARGED"]},
                        {"field": "payment_gateway", "condition": "In", "val": ["PAYU"]}
                    ],
                    "logic": "0 OR 1"
                }
            }),
            Environment::Production,
        )
        .unwrap();
        let tree = &req.body.unwrap()["qFilters"];
        // ((t0 AND t1) AND c0) OR c1
        assert_eq!(tree["or"]["right"]["field"], "payment_gateway");
        assert_eq!(tree["or"]["left"]["and"]["right"]["field"], "order_status");
        assert_eq!(
            tree["or"]["left"]["and"]["left"]["and"]["left"]["field"],
            "order_created_at"
        );
    }

    #[test]
    fn test_flat_filter_logic_errors() {
        let clauses = vec![clause("order_status", "In", json!(["CHARGED"]))];
        assert!(flat_filter_to_tree(&clauses, "0 AND 3").is_err());
        let bad = vec![json!({"field": "x", "condition": "Like", "val": 1})];
        assert!(flat_filter_to_tree(&bad, "0").is_err());
        assert_eq!(flat_filter_to_tree(&clauses, "(0)").unwrap(), clauses[0]);
    }

    #[test]
    fn test_payout_gateway_tools_use_payout_headers() {
        for (name, path) in [
            ("juspay_list_configured_payout_gateways", "/api/payout/batch/dashboard/v1/gatewaycredential"),
            ("juspay_get_payout_gateways", "/api/payout/batch/dashboard/v1/gateway"),
            ("juspay_get_active_payout_gateways", "/api/payout/dashboard/v1/prioritylogic/activemethods"),
            ("juspay_get_payout_priority_logics", "/api/payout/batch/dashboard/v1/prioritylogic"),
            ("juspay_get_payout_weblabs", "/api/payout/batch/dashboard/v1/weblabConfig"),
        ] {
            let req = build(name, json!({"tenant_id": "t1"}), Environment::Production).unwrap();
            assert_eq!(req.url, format!("https://portal.juspay.in{}", path), "{}", name);
            assert!(req.body.is_none(), "{}", name);
            assert_eq!(req.header_value("x-token-type"), Some("Euler"));
            assert_eq!(req.header_value("x-tenant-id"), Some("t1"));
        }
    }

    #[test]
    fn test_payout_gateway_details_path() {
        let req = build(
            "juspay_get_payout_gateway_details",
            json!({"gateway": "RAZORPAY", "rail": "IMPS"}),
            Environment::Production,
        )
        .unwrap();
        assert_eq!(
            req.url,
            "https://portal.juspay.in/api/payout/batch/dashboard/v1/gatewaycredential/RAZORPAY/IMPS"
        );
        assert!(req.body.is_none());

        assert!(build(
            "juspay_get_payout_gateway_details",
            json!({"gateway": "RAZORPAY"}),
            Environment::Production
        )
        .is_err());
    }

    #[test]
    fn test_payout_balance_force_flag() {
        let req = build("juspay_get_payout_balance", json!({}), Environment::Production).unwrap();
        assert_eq!(req.url, "https://portal.juspay.in/api/payout/batch/dashboard/v1/getways/balance");
        assert_eq!(req.query, vec![("force".to_string(), "false".to_string())]);

        let req = build("juspay_get_payout_balance", json!({"isForce": "true"}), Environment::Production).unwrap();
        assert_eq!(req.query, vec![("force".to_string(), "true".to_string())]);

        assert!(build("juspay_get_payout_balance", json!({"isForce": "yes"}), Environment::Production).is_err());
    }

    #[test]
    fn test_unified_alerts_request() {
        let spec = tools()
            .into_iter()
            .find(|t| t.name() == "juspay_list_unified_alerts")
            .unwrap();
        assert_eq!(spec.upstream, Upstream::Alerts);

        let req = build(
            "juspay_list_unified_alerts",
            json!({
                "merchantId": "m1",
                "startTime": "2025-10-05 13:45:00",
                "name": "Api Availability Drop",
                "dimensions": {"api": "TRANSACTION"}
            }),
            Environment::Production,
        )
        .unwrap();
        assert_eq!(req.url, "https://portal.juspay.in/getExternalAlerts");
        assert_eq!(req.header_value("token"), Some("tok"));
        let body = req.body.unwrap();
        assert_eq!(body["merchant_id"], "m1");
        assert_eq!(body["is_visible"], true);
        assert_eq!(body["select_columns"].as_array().unwrap().len(), ALERT_COLUMNS.len());
        assert_eq!(body["ts_alert"], json!({"start": "2025-10-05 13:45:00"}));
        assert_eq!(body["name"], "Api Availability Drop");
        assert_eq!(body["dimensions"], json!({"api": "TRANSACTION"}));

        let req = build("juspay_list_unified_alerts", json!({"merchantId": "m1"}), Environment::Production).unwrap();
        let body = req.body.unwrap();
        assert!(body.get("ts_alert").is_none());
        assert!(body.get("dimensions").is_none());
    }

    #[test]
    fn test_columns_to_rows() {
        let rows = columns_to_rows(json!({
            "name": ["drop", "spike"],
            "merchant_id": ["m1"]
        }));
        assert_eq!(
            rows,
            json!([
                {"name": "drop", "merchant_id": "m1"},
                {"name": "spike", "merchant_id": null}
            ])
        );
        assert_eq!(columns_to_rows(json!({})), json!([]));
        assert_eq!(columns_to_rows(json!([{"a": 1}])), json!([{"a": 1}]));
        assert_eq!(columns_to_rows(json!({"status": "ok"})), json!([{"status": "ok"}]));
    }

    #[test]
    fn test_feature_tools() {
        let req = build(
            "juspay_fetch_feature_details",
            json!({"merchant_id": "m1", "feature_id": "f1"}),
            Environment::Production,
        )
        .unwrap();
        assert_eq!(req.url, "https://portal.juspay.in/stein/feature-description/fetch");
        assert_eq!(req.body.unwrap(), json!({"merchant_id": "m1", "feature_id": "f1"}));

        let req = build("juspay_fetch_feature_list", json!({"merchant_id": "m1"}), Environment::Production).unwrap();
        assert_eq!(req.url, "https://portal.juspay.in/stein/feature-list/fetch");
        assert_eq!(req.body.unwrap(), json!({"merchant_id": "m1", "client_id": null}));
    }
}
