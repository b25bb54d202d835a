use chrono::{DateTime, FixedOffset, Offset, Utc};
use jizhang_core::{EntryReceipt, ParseError, ParseResult, PartialData};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::util::re;

pub const DEFAULT_REMARK: &str = "無";
const TIME_FORMAT: &str = "%Y/%m/%d %H:%M";

/// The fields echoed in every reply, already in display form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageData {
    pub amount: String,
    pub subject: String,
    pub payment_method: String,
    pub remark: String,
    pub timestamp: String,
    pub user_type: String,
}

impl MessageData {
    pub fn from_parsed(parsed: &ParseResult, remark: &str) -> Self {
        MessageData {
            amount: display_amount(&parsed.raw_amount, &parsed.amount.to_string()),
            subject: parsed.subject.clone(),
            payment_method: parsed.payment_method.to_string(),
            remark: remark.to_string(),
            ..MessageData::default()
        }
    }

    pub fn from_partial(partial: &PartialData, remark: &str) -> Self {
        MessageData {
            amount: display_amount(&partial.raw_amount, &partial.amount.to_string()),
            subject: partial.subject.clone(),
            payment_method: partial.payment_method.to_string(),
            remark: remark.to_string(),
            ..MessageData::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.amount.is_empty() && self.subject.is_empty() && self.payment_method.is_empty()
    }
}

/// Prefer the user's own digits (grouping, sign) over a re-stringified number.
fn display_amount(raw: &str, normalized: &str) -> String {
    if raw.trim().is_empty() {
        normalized.to_string()
    } else {
        raw.trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub data: MessageData,
    pub error: String,
    pub error_type: String,
}

impl Failure {
    pub fn from_parse_error(err: &ParseError, remark: &str) -> Self {
        Failure {
            data: MessageData::from_partial(err.partial(), remark),
            error: err.to_string(),
            error_type: err.kind().code().to_string(),
        }
    }
}

/// Canonical result shape produced by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Recorded(EntryReceipt),
    Failed(Failure),
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Used for the time line when the data carries no timestamp of its own.
    pub now: DateTime<Utc>,
    pub user_type: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { now: Utc::now(), user_type: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage {
    pub success: bool,
    pub message: String,
    pub partial_data: MessageData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Renders success and failure replies from a fixed template.
pub struct ResponseFormatter {
    offset: FixedOffset,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(8)
    }
}

impl ResponseFormatter {
    /// `utc_offset_hours` outside ±23 falls back to UTC.
    pub fn new(utc_offset_hours: i32) -> Self {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    fn format_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format(TIME_FORMAT).to_string()
    }

    /// `module_code` names the calling module; it is the last fallback for the
    /// user-type line.
    pub fn render(&self, outcome: &Outcome, module_code: &str, options: &RenderOptions) -> RenderedMessage {
        match outcome {
            Outcome::Recorded(receipt) => {
                let data = MessageData {
                    amount: display_amount(&receipt.raw_amount, &receipt.amount.to_string()),
                    subject: receipt.subject_name.clone(),
                    payment_method: receipt.payment_method.to_string(),
                    remark: receipt.remark.clone(),
                    timestamp: self.format_time(receipt.created_at),
                    user_type: receipt.user_type.clone(),
                };
                self.build(true, data, None, None, module_code, options)
            }
            Outcome::Failed(failure) => self.build(
                false,
                failure.data.clone(),
                Some(failure.error.as_str()),
                Some(failure.error_type.clone()),
                module_code,
                options,
            ),
        }
    }

    fn build(
        &self,
        success: bool,
        mut data: MessageData,
        error: Option<&str>,
        error_type: Option<String>,
        module_code: &str,
        options: &RenderOptions,
    ) -> RenderedMessage {
        if data.amount.trim().is_empty() {
            data.amount = "0".to_string();
        }
        if data.remark.trim().is_empty() {
            data.remark = DEFAULT_REMARK.to_string();
        }
        if data.timestamp.trim().is_empty() {
            data.timestamp = self.format_time(options.now);
        }
        if data.user_type.trim().is_empty() {
            data.user_type = options
                .user_type
                .clone()
                .unwrap_or_else(|| module_code.to_string());
        }

        let header = if success { "記帳成功！" } else { "記帳失敗！" };
        let mut message = format!(
            "{header}\n金額：{}元\n付款方式：{}\n時間：{}\n科目：{}\n備註：{}\n使用者類型：{}",
            data.amount, data.payment_method, data.timestamp, data.subject, data.remark, data.user_type,
        );
        if !success {
            let reason = error.filter(|e| !e.trim().is_empty()).unwrap_or("未知錯誤");
            message.push_str(&format!("\n錯誤原因：{reason}"));
        }

        debug!(module = module_code, success, "rendered reply");
        RenderedMessage { success, message, partial_data: data, error_type }
    }

    // ── Lenient boundary adapter ──────────────────────────────────────────────

    /// Render a loosely shaped JSON result from an external caller.
    ///
    /// A ready `responseMessage` passes through unchanged. Otherwise the data
    /// is taken from the first populated location in [`DATA_SOURCES`], falling
    /// back to reading the labeled lines of a previously rendered message.
    pub fn render_value(&self, value: &Value, module_code: &str, options: &RenderOptions) -> RenderedMessage {
        let success = value.get("success").and_then(Value::as_bool).unwrap_or(false);
        let error_type = first_string(value, ERROR_TYPE_SOURCES);

        if let Some(message) = value
            .get("responseMessage")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
        {
            return RenderedMessage {
                success,
                message: message.to_string(),
                partial_data: parse_labeled_lines(message),
                error_type,
            };
        }

        let data = DATA_SOURCES
            .iter()
            .filter_map(|ptr| value.pointer(ptr))
            .map(|v| self.data_from_value(v))
            .find(|d| !d.is_empty())
            .or_else(|| {
                first_string(value, MESSAGE_SOURCES)
                    .map(|m| parse_labeled_lines(&m))
                    .filter(|d| !d.is_empty())
            })
            .unwrap_or_default();

        let error = first_string(value, ERROR_SOURCES);
        let error_type = if success {
            error_type
        } else {
            error_type.or_else(|| Some("unknown".to_string()))
        };
        self.build(success, data, error.as_deref(), error_type, module_code, options)
    }

    fn data_from_value(&self, v: &Value) -> MessageData {
        let amount_number = v.get("amount").map(|a| match a {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        let raw = str_field(v, &["rawAmount", "originalAmount"]);
        let timestamp = match v.get("timestamp") {
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|t| self.format_time(t))
                .unwrap_or_default(),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|t| self.format_time(t.with_timezone(&Utc)))
                .unwrap_or_else(|_| s.clone()),
            _ => {
                let date = str_field(v, &["date"]);
                let time = str_field(v, &["time"]);
                format!("{date} {time}").trim().to_string()
            }
        };
        MessageData {
            amount: display_amount(&raw, &amount_number.unwrap_or_default()),
            subject: str_field(v, &["subject", "subjectName", "subName"]),
            payment_method: str_field(v, &["paymentMethod", "payment"]),
            remark: str_field(v, &["remark", "note"]),
            timestamp,
            user_type: str_field(v, &["userType"]),
        }
    }
}

const DATA_SOURCES: &[&str] = &[
    "/parsedData",
    "/partialData",
    "/errorData/partialData",
    "/errorData",
    "/previousResult/partialData",
    "/previousResult",
];
const MESSAGE_SOURCES: &[&str] = &["/previousResult/responseMessage", "/previousMessage", "/message"];
const ERROR_SOURCES: &[&str] = &["/error", "/errorMessage", "/errorData/error", "/errorData/message", "/reason"];
const ERROR_TYPE_SOURCES: &[&str] = &["/errorType", "/errorData/errorType"];

fn str_field(v: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| v.get(*k))
        .find_map(|f| match f {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn first_string(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|p| value.pointer(p))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

re!(re_labeled_line,
    r"^\s*(金額|付款方式|時間|科目|備註|使用者類型)\s*[：:]\s*(.*?)\s*$");

/// Recover the echoed fields from a message produced by [`ResponseFormatter`].
pub fn parse_labeled_lines(message: &str) -> MessageData {
    let mut data = MessageData::default();
    for line in message.lines() {
        let Some(c) = re_labeled_line().captures(line) else {
            continue;
        };
        let value = c[2].to_string();
        match &c[1] {
            "金額" => data.amount = value.trim_end_matches('元').trim().to_string(),
            "付款方式" => data.payment_method = value,
            "時間" => data.timestamp = value,
            "科目" => data.subject = value,
            "備註" => data.remark = value,
            "使用者類型" => data.user_type = value,
            _ => {}
        }
    }
    data
}
