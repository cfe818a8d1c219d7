//! API 模块：Comprehend 操作定义、客户端抽象以及按能力构造的调用函数。
//!
//! # Comprehend API Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Operation`] | Every Comprehend / Comprehend Medical operation the crate calls |
//! | [`ComprehendApi`] | Client seam; [`crate::transport::HttpComprehendClient`] is the network implementation |
//! | [`CapabilityCall`] | Builds request payloads for one capability from rows |
//! | [`RateLimitedApi`] | Wraps any [`crate::parallelizer::ApiFunction`] with a shared limiter and a retrier |

mod calls;
mod rate_limited;

pub use calls::{Capability, CapabilityCall, LanguageSource, MedicalDetection};
pub use rate_limited::RateLimitedApi;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Comprehend,
    ComprehendMedical,
}

impl Service {
    /// Service name used in the SigV4 scope and the default host.
    pub fn signing_name(&self) -> &'static str {
        match self {
            Service::Comprehend => "comprehend",
            Service::ComprehendMedical => "comprehendmedical",
        }
    }

    fn target_prefix(&self) -> &'static str {
        match self {
            Service::Comprehend => "Comprehend_20171127",
            Service::ComprehendMedical => "ComprehendMedical_20181030",
        }
    }

    pub fn default_endpoint(&self, region: &str) -> String {
        format!("https://{}.{}.amazonaws.com/", self.signing_name(), region)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DetectSentiment,
    BatchDetectSentiment,
    DetectKeyPhrases,
    BatchDetectKeyPhrases,
    DetectEntities,
    BatchDetectEntities,
    DetectDominantLanguage,
    BatchDetectDominantLanguage,
    /// Comprehend Medical entity detection.
    DetectEntitiesV2,
    /// Comprehend Medical protected health information detection.
    DetectPhi,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::DetectSentiment => "DetectSentiment",
            Operation::BatchDetectSentiment => "BatchDetectSentiment",
            Operation::DetectKeyPhrases => "DetectKeyPhrases",
            Operation::BatchDetectKeyPhrases => "BatchDetectKeyPhrases",
            Operation::DetectEntities => "DetectEntities",
            Operation::BatchDetectEntities => "BatchDetectEntities",
            Operation::DetectDominantLanguage => "DetectDominantLanguage",
            Operation::BatchDetectDominantLanguage => "BatchDetectDominantLanguage",
            Operation::DetectEntitiesV2 => "DetectEntitiesV2",
            Operation::DetectPhi => "DetectPHI",
        }
    }

    pub fn service(&self) -> Service {
        match self {
            Operation::DetectEntitiesV2 | Operation::DetectPhi => Service::ComprehendMedical,
            _ => Service::Comprehend,
        }
    }

    /// Value of the `X-Amz-Target` header.
    pub fn target(&self) -> String {
        format!("{}.{}", self.service().target_prefix(), self.name())
    }

    pub fn is_batch(&self) -> bool {
        matches!(
            self,
            Operation::BatchDetectSentiment
                | Operation::BatchDetectKeyPhrases
                | Operation::BatchDetectEntities
                | Operation::BatchDetectDominantLanguage
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A Comprehend client.
///
/// `payload` is the JSON request body; the returned value is the JSON
/// response body. Provider errors come back as [`crate::Error::Remote`].
#[async_trait]
pub trait ComprehendApi: Send + Sync {
    async fn invoke(&self, operation: Operation, payload: Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets() {
        assert_eq!(
            Operation::BatchDetectSentiment.target(),
            "Comprehend_20171127.BatchDetectSentiment"
        );
        assert_eq!(Operation::DetectPhi.target(), "ComprehendMedical_20181030.DetectPHI");
        assert_eq!(Operation::DetectEntitiesV2.service().signing_name(), "comprehendmedical");
    }

    #[test]
    fn test_batch_flags() {
        assert!(Operation::BatchDetectKeyPhrases.is_batch());
        assert!(!Operation::DetectKeyPhrases.is_batch());
        assert!(!Operation::DetectPhi.is_batch());
    }

    #[test]
    fn test_default_endpoint() {
        assert_eq!(
            Service::Comprehend.default_endpoint("eu-west-1"),
            "https://comprehend.eu-west-1.amazonaws.com/"
        );
    }
}
