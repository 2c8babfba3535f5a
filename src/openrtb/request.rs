use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenRTB BidRequest 结构体
///
/// 只有 `imp` 会被竞价逻辑解析，device / user / site 等上下文字段原样透传，
/// 保存为 JSON `Value`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BidRequest {
    pub id: String,

    /// 广告展示请求列表（imp），竞价只使用第一个
    pub imp: Vec<Imp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    // 其它简单字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmax: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcat: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badv: Option<Vec<String>>,
}

/// Imp 表示一次广告展示机会
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Imp {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidfloor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidfloorcur: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// Banner 尺寸，竞价响应中的 w / h 必须与之一致
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Banner {
    pub w: i32,
    pub h: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

impl BidRequest {
    /// 第一个 imp（竞价只看这一个）
    pub fn first_imp(&self) -> Option<&Imp> {
        self.imp.first()
    }
}
