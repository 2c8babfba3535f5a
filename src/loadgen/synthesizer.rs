// src/loadgen/synthesizer.rs

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};

use crate::config::RequestTemplate;
use crate::error::ConfigError;
use crate::openrtb::request::{Banner, BidRequest, Imp};
use crate::openrtb::{ceil_cents, filler, floor_cents, round_cents};

/// 由注入的随机源生成 UUID v4，种子固定时结果可复现
fn uuid_from<R: Rng>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.gen::<[u8; 16]>())
        .into_uuid()
        .to_string()
}

fn pick<'a, R: Rng>(choices: &'a [String], rng: &mut R) -> &'a str {
    // validate() 保证 choices 非空
    choices.choose(rng).map(String::as_str).unwrap_or_default()
}

/// **合成 BidRequest**
///
/// 所有字段来自 `RequestTemplate`，随机部分只依赖调用方传入的 rng，
/// 因此可以在任意多个任务中并发调用。
#[derive(Debug, Clone)]
pub struct RequestSynthesizer {
    template: RequestTemplate,
}

impl RequestSynthesizer {
    pub fn new(template: RequestTemplate) -> Result<Self, ConfigError> {
        template.validate()?;
        Ok(Self { template })
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn synthesize<R: Rng>(&self, rng: &mut R) -> BidRequest {
        let t = &self.template;

        BidRequest {
            id: uuid_from(rng),
            imp: vec![self.impression(rng)],
            device: Some(self.device(rng)),
            user: Some(self.user(rng)),
            site: Some(self.site(rng)),
            source: Some(json!({
                "ext": { "ts": chrono::Utc::now().timestamp().to_string() },
                "pchain": "1lmo0cdhb6woJTWl0Bouj5dXR5b",
                "tid": "1lmo0hJYZX5eH3BPmqHSVzYfSGa"
            })),
            regs: Some(json!({
                "coppa": 0,
                "ext": { "gdpr": 0, "sb568": 0 }
            })),
            ext: Some(self.ext()),
            at: Some(1),
            tmax: Some(t.tmax),
            cur: Some(vec![t.currency.clone()]),
            bcat: Some(t.bcat.clone()),
            badv: Some(t.badv.clone()),
        }
    }

    /// 底价在 [min, max] 内均匀分布，保留两位小数，
    /// 并限制在区间内的整分金额 [ceil_cents(min), floor_cents(max)] 之间
    fn floor_price<R: Rng>(&self, rng: &mut R) -> f64 {
        let range = self.template.floor;
        round_cents(rng.gen_range(range.min..=range.max))
            .clamp(ceil_cents(range.min), floor_cents(range.max))
    }

    fn impression<R: Rng>(&self, rng: &mut R) -> Imp {
        let t = &self.template;
        Imp {
            id: uuid_from(rng),
            bidfloor: Some(self.floor_price(rng)),
            bidfloorcur: Some(t.currency.clone()),
            banner: Some(Banner {
                w: t.banner_w,
                h: t.banner_h,
                mimes: Some("text/html".to_string()),
                ext: Some(json!({ "qty": 2, "unit": 1 })),
            }),
            tagid: Some(uuid_from(rng)),
            exp: Some(4),
            ext: Some(json!({ "ssai": 1 })),
        }
    }

    fn device<R: Rng>(&self, rng: &mut R) -> Value {
        let ip = format!(
            "{}.{}.{}.{}",
            rng.gen_range(1..=255),
            rng.gen_range(1..=255),
            rng.gen_range(1..=255),
            rng.gen_range(1..=255)
        );
        json!({
            "devicetype": 2,
            "ifa": uuid_from(rng),
            "ip": ip,
            "language": "en",
            "make": "desktop",
            "model": "browser",
            "os": pick(&self.template.os_choices, rng),
            "osv": "10",
            "ua": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.88 Safari/537.36"
        })
    }

    fn user<R: Rng>(&self, rng: &mut R) -> Value {
        let t = &self.template;
        json!({
            "buyeruid": uuid_from(rng),
            "data": [{
                "id": "pub-demographics",
                "name": "data_name",
                "segment": [{
                    "id": "345qw245wfrtgwertrt56765wert",
                    "name": "segment_name",
                    "value": "segment_value"
                }]
            }],
            "gender": pick(&t.gender_choices, rng),
            "geo": {
                "city": "San Francisco",
                "country": pick(&t.country_choices, rng),
                "ext": { "continent": "north america", "dma": 650, "state": "oklahoma" },
                "lat": 37.789,
                "lon": -122.394,
                "region": "CA",
                "type": 2,
                "zip": "94105"
            },
            "id": uuid_from(rng),
            "yob": rng.gen_range(t.yob_range.0..=t.yob_range.1)
        })
    }

    fn site<R: Rng>(&self, rng: &mut R) -> Value {
        json!({
            "cat": ["1", "33", "544", "765", "1222", "1124", "789", "995", "133", "45", "76", "91"],
            "domain": self.template.site_domain,
            "page": "http://easy.example.com/easy?cu=13824;cre=mu;target=_blank",
            "publisher": {
                "domain": "my.site.com",
                "id": uuid_from(rng),
                "name": "site_name"
            },
            "ref": "http://tpc.googlesyndication.com/pagead/js/loader12.html?http://sdk.streamrail.com/vpaid/js/668/sam.js"
        })
    }

    fn ext(&self) -> Value {
        let mut ext = json!({ "cattax": 2 });
        if self.template.filler_bytes > 0 {
            ext["filler"] = Value::String(filler(self.template.filler_bytes));
        }
        ext
    }
}
