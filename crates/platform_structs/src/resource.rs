use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Resource collections this workspace touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum Collection {
    #[strum(serialize = "customJobs")]
    CustomJobs,
    #[strum(serialize = "models")]
    Models,
    #[strum(serialize = "endpoints")]
    Endpoints,
    #[strum(serialize = "pipelineJobs")]
    PipelineJobs,
}

/// A fully qualified platform resource name,
/// `projects/{project}/locations/{location}/{collection}/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName {
    pub project: String,
    pub location: String,
    pub collection: Collection,
    pub id: String,
}

impl ResourceName {
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        collection: Collection,
        id: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            collection,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn endpoint(project: &str, location: &str, id: &str) -> Self {
        Self::new(project, location, Collection::Endpoints, id)
    }

    #[must_use]
    pub fn model(project: &str, location: &str, id: &str) -> Self {
        Self::new(project, location, Collection::Models, id)
    }

    /// Returns the trailing path segment, i.e. the short identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl FromStr for ResourceName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseError::ResourceName(s.to_string());

        let segments: Vec<&str> = s.trim_matches('/').split('/').collect();
        let [projects, project, locations, location, collection, id] = segments.as_slice() else {
            return Err(malformed());
        };

        if *projects != "projects" || *locations != "locations" {
            return Err(malformed());
        }
        if project.is_empty() || location.is_empty() || id.is_empty() {
            return Err(malformed());
        }

        let collection = Collection::from_str(collection).map_err(|_| malformed())?;

        Ok(Self::new(*project, *location, collection, *id))
    }
}

impl TryFrom<String> for ResourceName {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceName> for String {
    fn from(value: ResourceName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/{}/{}",
            self.project, self.location, self.collection, self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_name() {
        let name: ResourceName = "projects/123/locations/us-central1/endpoints/456789"
            .parse()
            .unwrap();
        assert_eq!(name.project, "123");
        assert_eq!(name.location, "us-central1");
        assert_eq!(name.collection, Collection::Endpoints);
        assert_eq!(name.id(), "456789");
    }

    #[test]
    fn test_display_roundtrip() {
        let name = ResourceName::endpoint("demo", "us-central1", "42");
        assert_eq!(
            name.to_string(),
            "projects/demo/locations/us-central1/endpoints/42"
        );
    }

    #[test]
    fn test_parse_rejects_unknown_collection() {
        assert!("projects/p/locations/l/datasets/1".parse::<ResourceName>().is_err());
    }

    #[test]
    fn test_parse_rejects_short_name() {
        assert!("projects/p/locations/l".parse::<ResourceName>().is_err());
        assert!("endpoints/1".parse::<ResourceName>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let name = ResourceName::model("p", "l", "7");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"projects/p/locations/l/models/7\"");
        let back: ResourceName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
