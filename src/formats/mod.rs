// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

mod digest;
pub mod oci;

pub use self::digest::{Digest, Hasher, Invalid};
pub use self::oci::{
    Descriptor, History, Image, ImageConfig, Manifest, ManifestDescriptor, ManifestList,
    ManifestPlatform, Ref, Rootfs, Versioned,
};

use crate::error::{Error, Result};
use crate::json;

use serde_json::Value;

pub const MEDIA_TYPE_DESCRIPTOR: &str = "application/vnd.oci.descriptor.v1+json";
pub const MEDIA_TYPE_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_IMAGE_MANIFEST_LIST: &str = "application/vnd.oci.image.manifest.list.v1+json";
pub const MEDIA_TYPE_IMAGE_LAYER: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
pub const MEDIA_TYPE_IMAGE_LAYER_NONDISTRIBUTABLE: &str =
    "application/vnd.oci.image.layer.nondistributable.v1.tar+gzip";
pub const MEDIA_TYPE_IMAGE_CONFIG: &str = "application/vnd.oci.image.config.v1+json";

/// A document that is either a manifest or a manifest list
///
/// Which one is decided by its `mediaType` member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionedManifest {
    Manifest(Manifest),
    List(ManifestList),
}

impl VersionedManifest {
    pub fn from_value(value: &Value) -> Result<Self> {
        let media_type = value
            .get("mediaType")
            .and_then(Value::as_str)
            .ok_or(Error::MissingMediaType)?;

        match media_type {
            MEDIA_TYPE_IMAGE_MANIFEST => Ok(Self::Manifest(json::from_value(value)?)),
            MEDIA_TYPE_IMAGE_MANIFEST_LIST => Ok(Self::List(json::from_value(value)?)),
            other => Err(Error::UnsupportedMediaType(other.into())),
        }
    }

    pub fn versioned(&self) -> &Versioned {
        match self {
            Self::Manifest(m) => &m.versioned,
            Self::List(l) => &l.versioned,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Manifest(m) => json::to_value(m),
            Self::List(l) => json::to_value(l),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json::json;

    #[test]
    fn dispatch_manifest() {
        let value = json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_IMAGE_MANIFEST,
            "layers": []
        });

        match VersionedManifest::from_value(&value).unwrap() {
            VersionedManifest::Manifest(m) => assert!(m.layers.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dispatch_list() {
        let value = json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_IMAGE_MANIFEST_LIST,
            "manifests": [{"mediaType": MEDIA_TYPE_IMAGE_MANIFEST, "size": 1}]
        });

        let versioned = VersionedManifest::from_value(&value).unwrap();
        assert_eq!(versioned.versioned().schema_version, 2);
        assert!(matches!(versioned, VersionedManifest::List(ref l) if l.manifests.len() == 1));
        assert_eq!(versioned.to_value(), value);
    }

    #[test]
    fn dispatch_failures() {
        assert!(matches!(
            VersionedManifest::from_value(&json!({"schemaVersion": 2})),
            Err(Error::MissingMediaType)
        ));

        assert!(matches!(
            VersionedManifest::from_value(&json!({"mediaType": 7})),
            Err(Error::MissingMediaType)
        ));

        let docker = "application/vnd.docker.distribution.manifest.v2+json";
        match VersionedManifest::from_value(&json!({"mediaType": docker})) {
            Err(Error::UnsupportedMediaType(m)) => assert_eq!(m, docker),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn dispatch_propagates_validation() {
        let value = json!({"mediaType": MEDIA_TYPE_IMAGE_MANIFEST, "layers": [{"size": "big"}]});
        assert!(matches!(
            VersionedManifest::from_value(&value),
            Err(Error::Validation { .. })
        ));
    }
}
