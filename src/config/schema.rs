//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the invoker.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the RPC invoker.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct InvokerConfig {
    /// Circuit breaker thresholds, applied to every service.
    pub breaker: BreakerConfig,

    /// Default retry policy.
    pub retry: RetryConfig,

    /// Keyword lists for untyped errors.
    pub classifier: ClassifierConfig,

    /// User-facing messages for unavailable services.
    pub messages: MessagesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Length of the failure-rate window in seconds.
    pub window_secs: u64,

    /// Samples required in the window before the rate is judged.
    pub min_requests: u32,

    /// Open when failures / requests reaches this ratio.
    pub failure_ratio: f64,

    /// Time spent open before allowing trial calls, in milliseconds.
    pub cooldown_ms: u64,

    /// Concurrent trial calls allowed while half-open.
    pub half_open_max_calls: u32,

    /// Trial successes needed to close again.
    pub success_threshold: u32,
}

impl BreakerConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_secs: 10,
            min_requests: 5,
            failure_ratio: 0.5,
            cooldown_ms: 5_000,
            half_open_max_calls: 1,
            success_threshold: 1,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay_ms: 200,
        }
    }
}

/// Keyword lists used to classify errors that carry no structured kind.
/// Business keywords are checked first.
///
/// Keywords are trimmed and lowercased before matching, so `" Timeout "`
/// behaves like `"timeout"`. Validation rejects blank entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub business_keywords: Vec<String>,
    pub system_keywords: Vec<String>,
}

const BUSINESS_KEYWORDS: &[&str] = &[
    "参数错误",
    "权限不足",
    "用户不存在",
    "产品不存在",
    "申请不存在",
    "状态错误",
    "重复提交",
    "余额不足",
    "库存不足",
    "密码错误",
    "用户已存在",
    "手机号已注册",
    "验证码错误",
    "token无效",
    "未找到",
    "已存在",
    "无权限",
    "数据不存在",
];

const SYSTEM_KEYWORDS: &[&str] = &[
    "连接超时",
    "网络错误",
    "服务不可用",
    "连接失败",
    "超时",
    "网络异常",
    "服务异常",
    "系统异常",
    "internal error",
    "connection",
    "timeout",
    "unavailable",
];

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            business_keywords: BUSINESS_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            system_keywords: SYSTEM_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Friendly messages shown when a service is unavailable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Message for services without an entry.
    pub default: String,

    /// Service id -> message.
    pub services: HashMap<String, String>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        let services = [
            ("appuser-rpc", "用户服务暂时不可用，请稍后重试"),
            ("oauser-rpc", "管理员服务暂时不可用，请稍后重试"),
            ("loan-rpc", "贷款服务暂时不可用，请稍后重试"),
            ("lease-rpc", "租赁服务暂时不可用，请稍后重试"),
            ("loanproduct-rpc", "贷款产品服务暂时不可用，请稍后重试"),
            ("leaseproduct-rpc", "租赁产品服务暂时不可用，请稍后重试"),
        ]
        .into_iter()
        .map(|(service, message)| (service.to_string(), message.to_string()))
        .collect();

        Self {
            default: "服务暂时不可用，请稍后重试".to_string(),
            services,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
