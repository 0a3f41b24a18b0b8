use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{GcsUri, ParseError, ResourceName};

/// Key used in a deploy request to refer to the model being deployed.
pub const NEW_DEPLOYMENT_KEY: &str = "0";

/// A registered model: an artifact directory paired with a serving image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub resource_name: ResourceName,
    pub display_name: String,
    pub artifact_uri: GcsUri,
    pub serving_image: String,
}

/// A model attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedModelRecord {
    /// Deployment id, unique within the endpoint
    pub id: String,

    /// Resource name of the deployed model record
    pub model: String,

    pub display_name: Option<String>,
}

/// A serving endpoint and what is attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub resource_name: ResourceName,
    pub display_name: String,
    pub deployed_models: Vec<DeployedModelRecord>,
    pub traffic_split: TrafficSplit,
}

impl EndpointRecord {
    /// Returns the short endpoint id, the trailing segment of the resource name.
    #[must_use]
    pub fn endpoint_id(&self) -> &str {
        self.resource_name.id()
    }
}

/// Percentage of prediction traffic routed to each deployed model.
///
/// Percentages sum to 100 whenever at least one model is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficSplit(BTreeMap<String, u32>);

impl TrafficSplit {
    /// Routes all traffic to a single deployment.
    #[must_use]
    pub fn single(deployed_model_id: impl Into<String>) -> Self {
        Self(BTreeMap::from([(deployed_model_id.into(), 100)]))
    }

    /// Builds a split from explicit percentages, checking they sum to 100.
    pub fn from_percentages<I, K>(entries: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<String>,
    {
        let split = Self(
            entries
                .into_iter()
                .map(|(id, percent)| (id.into(), percent))
                .collect(),
        );
        split.validate()?;
        Ok(split)
    }

    /// Checks the sum invariant.
    pub fn validate(&self) -> Result<(), ParseError> {
        let total = self.total();
        if self.0.is_empty() || total == 100 {
            Ok(())
        } else {
            Err(ParseError::TrafficSum(total))
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    #[must_use]
    pub fn get(&self, deployed_model_id: &str) -> Option<u32> {
        self.0.get(deployed_model_id).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the split that remains once `deployed_model_id` is detached.
    ///
    /// The detached model's share is handed to the remaining models in
    /// proportion to their current share; if they all had zero traffic it is
    /// spread evenly.
    #[must_use]
    pub fn without(&self, deployed_model_id: &str) -> Self {
        let remaining: Vec<(&String, u32)> = self
            .0
            .iter()
            .filter(|(id, _)| id.as_str() != deployed_model_id)
            .map(|(id, percent)| (id, *percent))
            .collect();

        if remaining.is_empty() {
            return Self::default();
        }

        let total: u32 = remaining.iter().map(|(_, percent)| percent).sum();
        let weights: Vec<u32> = if total == 0 {
            vec![1; remaining.len()]
        } else {
            remaining.iter().map(|(_, percent)| *percent).collect()
        };

        let shares = apportion(&weights, 100);

        Self(
            remaining
                .into_iter()
                .zip(shares)
                .map(|((id, _), share)| (id.clone(), share))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(id, percent)| (id.as_str(), *percent))
    }
}

/// Largest-remainder apportionment of `total` across `weights`.
fn apportion(weights: &[u32], total: u32) -> Vec<u32> {
    let weight_sum: u64 = weights.iter().map(|w| u64::from(*w)).sum();
    if weight_sum == 0 {
        return vec![0; weights.len()];
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (index, weight) in weights.iter().enumerate() {
        let exact = u64::from(*weight) * u64::from(total);
        // Quotient is bounded by `total`, so it fits in u32.
        let share = u32::try_from(exact / weight_sum).unwrap_or(total);
        shares.push(share);
        remainders.push((exact % weight_sum, index));
    }

    let assigned: u32 = shares.iter().sum();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, index) in remainders.into_iter().take((total - assigned) as usize) {
        if let Some(share) = shares.get_mut(index) {
            *share += 1;
        }
    }

    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_split_is_valid() {
        let split = TrafficSplit::single(NEW_DEPLOYMENT_KEY);
        assert_eq!(split.get("0"), Some(100));
        assert!(split.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_sum() {
        let err = TrafficSplit::from_percentages([("a", 60), ("b", 30)]).unwrap_err();
        assert_eq!(err, ParseError::TrafficSum(90));
    }

    #[test]
    fn test_without_last_model_is_empty() {
        let split = TrafficSplit::single("a");
        assert!(split.without("a").is_empty());
    }

    #[test]
    fn test_without_redistributes_proportionally() {
        let split = TrafficSplit::from_percentages([("a", 50), ("b", 30), ("c", 20)]).unwrap();
        let rest = split.without("a");
        assert_eq!(rest.get("b"), Some(60));
        assert_eq!(rest.get("c"), Some(40));
        assert_eq!(rest.total(), 100);
    }

    #[test]
    fn test_without_rounds_to_hundred() {
        let split =
            TrafficSplit::from_percentages([("a", 1), ("b", 33), ("c", 33), ("d", 33)]).unwrap();
        let rest = split.without("a");
        assert_eq!(rest.total(), 100);
        assert_eq!(rest.len(), 3);
    }

    #[test]
    fn test_without_spreads_evenly_when_remaining_idle() {
        let split = TrafficSplit::from_percentages([("a", 100), ("b", 0), ("c", 0)]).unwrap();
        let rest = split.without("a");
        assert_eq!(rest.get("b"), Some(50));
        assert_eq!(rest.get("c"), Some(50));
    }

    #[test]
    fn test_serializes_as_map() {
        let json = serde_json::to_value(TrafficSplit::single("0")).unwrap();
        assert_eq!(json, serde_json::json!({ "0": 100 }));
    }
}
