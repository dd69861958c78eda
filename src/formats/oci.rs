// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::collections::BTreeMap;

use super::{Digest, MEDIA_TYPE_IMAGE_MANIFEST, MEDIA_TYPE_IMAGE_MANIFEST_LIST};
use crate::error::{Error, Result};
use crate::json::{Field, Record};

/// A reference to content by media type, digest and size
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub media_type: String,

    pub digest: String,

    pub size: i64,

    pub urls: Vec<String>,
}

impl Record for Descriptor {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(String, media_type, "mediaType"),
        field!(String, digest, "digest"),
        field!(Int64, size, "size"),
        field!(StringList, urls, "urls"),
    ];
}

impl Descriptor {
    pub fn new(media_type: &str, digest: Digest, size: i64) -> Self {
        Self {
            media_type: media_type.into(),
            digest: digest.to_string(),
            size,
            urls: Vec::new(),
        }
    }

    /// Checks the digest is a well-formed sha256 digest and the size is sane
    pub fn validate(&self) -> Result<Digest> {
        if self.size < 0 {
            return Err(Error::InvalidSize(self.size));
        }

        Digest::parse(&self.digest)
    }
}

/// A named pointer to a descriptor, as stored under `refs/`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ref {
    pub descriptor: Descriptor,
}

impl Record for Ref {
    const SCHEMA: &'static [Field<Self>] = &[field!(Parent, descriptor)];
}

impl Ref {
    pub fn new(media_type: &str, digest: &str, size: i64) -> Self {
        Self {
            descriptor: Descriptor {
                media_type: media_type.into(),
                digest: digest.into(),
                size,
                urls: Vec::new(),
            },
        }
    }
}

/// The platform a manifest list entry targets
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestPlatform {
    pub architecture: String,

    pub os: String,

    pub os_version: String,

    pub os_features: Vec<String>,

    pub variant: String,

    pub features: Vec<String>,
}

impl Record for ManifestPlatform {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(String, architecture, "architecture"),
        field!(String, os, "os"),
        field!(String, os_version, "os.version"),
        field!(String, variant, "variant"),
        field!(StringList, os_features, "os.features"),
        field!(StringList, features, "features"),
    ];
}

/// One entry of a manifest list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestDescriptor {
    pub descriptor: Descriptor,

    pub platform: ManifestPlatform,
}

impl Record for ManifestDescriptor {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(Parent, descriptor),
        field!(Struct, platform, "platform"),
    ];
}

/// The members every manifest-like document starts with
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Versioned {
    pub schema_version: i64,

    pub media_type: String,
}

impl Record for Versioned {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(Int64, schema_version, "schemaVersion"),
        field!(String, media_type, "mediaType"),
    ];
}

impl Versioned {
    fn new(media_type: &str) -> Self {
        Self {
            schema_version: 2,
            media_type: media_type.into(),
        }
    }
}

/// An image manifest: one config blob and its ordered layers
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    pub versioned: Versioned,

    pub config: Descriptor,

    pub layers: Vec<Descriptor>,

    pub annotations: BTreeMap<String, String>,
}

impl Record for Manifest {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(Parent, versioned),
        field!(Struct, config, "config"),
        field!(StructList, layers, "layers"),
        field!(StringMap, annotations, "annotations"),
    ];
}

impl Manifest {
    pub fn new(config: Descriptor, layers: Vec<Descriptor>) -> Self {
        Self {
            versioned: Versioned::new(MEDIA_TYPE_IMAGE_MANIFEST),
            config,
            layers,
            annotations: BTreeMap::new(),
        }
    }
}

/// A manifest list: per-platform manifests of one image
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestList {
    pub versioned: Versioned,

    pub manifests: Vec<ManifestDescriptor>,

    pub annotations: BTreeMap<String, String>,
}

impl Record for ManifestList {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(Parent, versioned),
        field!(StructList, manifests, "manifests"),
        field!(StringMap, annotations, "annotations"),
    ];
}

impl ManifestList {
    pub fn new(manifests: Vec<ManifestDescriptor>) -> Self {
        Self {
            versioned: Versioned::new(MEDIA_TYPE_IMAGE_MANIFEST_LIST),
            manifests,
            annotations: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rootfs {
    pub kind: String,

    pub diff_ids: Vec<String>,
}

impl Record for Rootfs {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(String, kind, "type"),
        field!(StringList, diff_ids, "diff_ids"),
    ];
}

/// The runtime defaults of an image
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageConfig {
    pub user: String,

    pub memory: i64,

    pub memory_swap: i64,

    pub cpu_shares: i64,

    pub exposed_ports: Vec<String>,

    pub env: Vec<String>,

    pub entrypoint: Vec<String>,

    pub cmd: Vec<String>,

    pub volumes: Vec<String>,

    pub working_dir: String,

    pub labels: BTreeMap<String, String>,
}

impl Record for ImageConfig {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(String, user, "User"),
        field!(Int64, memory, "Memory"),
        field!(Int64, memory_swap, "MemorySwap"),
        field!(Int64, cpu_shares, "CpuShares"),
        field!(StringSet, exposed_ports, "ExposedPorts"),
        field!(StringList, env, "Env"),
        field!(StringList, entrypoint, "Entrypoint"),
        field!(StringList, cmd, "Cmd"),
        field!(StringSet, volumes, "Volumes"),
        field!(String, working_dir, "WorkingDir"),
        field!(StringMap, labels, "Labels"),
    ];
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    pub created: String,

    pub created_by: String,

    pub author: String,

    pub comment: String,

    pub empty_layer: bool,
}

impl Record for History {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(String, created, "created"),
        field!(String, created_by, "created_by"),
        field!(String, author, "author"),
        field!(String, comment, "comment"),
        field!(Bool, empty_layer, "empty_layer"),
    ];
}

/// An image configuration blob
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    pub created: String,

    pub author: String,

    pub architecture: String,

    pub os: String,

    pub config: ImageConfig,

    pub rootfs: Rootfs,

    pub history: Vec<History>,
}

impl Record for Image {
    const SCHEMA: &'static [Field<Self>] = &[
        field!(String, created, "created"),
        field!(String, author, "author"),
        field!(String, architecture, "architecture"),
        field!(String, os, "os"),
        field!(Struct, config, "config"),
        field!(Struct, rootfs, "rootfs"),
        field!(StructList, history, "history"),
    ];
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::formats::MEDIA_TYPE_IMAGE_LAYER;
    use crate::json::{from_value, to_value};

    use serde_json::json;

    const CONFIG: &str = "sha256:b5b2b2c507a0944348e0303114d8d93aaaa081732b86451d9bce1f432a537bc7";
    const LAYER: &str = "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0";

    #[test]
    fn manifest() {
        let value = json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_IMAGE_MANIFEST,
            "config": {
                "mediaType": "application/vnd.oci.image.config.v1+json",
                "size": 7023,
                "digest": CONFIG
            },
            "layers": [{
                "mediaType": MEDIA_TYPE_IMAGE_LAYER,
                "size": 32654,
                "digest": LAYER,
                "urls": ["https://mirror.example.com/layer"]
            }],
            "annotations": {"com.example.key1": "value1"}
        });

        let manifest: Manifest = from_value(&value).unwrap();
        assert_eq!(manifest.versioned.schema_version, 2);
        assert_eq!(manifest.versioned.media_type, MEDIA_TYPE_IMAGE_MANIFEST);
        assert_eq!(manifest.config.size, 7023);
        assert_eq!(manifest.config.digest, CONFIG);
        assert_eq!(manifest.layers.len(), 1);
        assert_eq!(manifest.layers[0].urls, vec!["https://mirror.example.com/layer"]);
        assert_eq!(manifest.annotations["com.example.key1"], "value1");

        assert_eq!(to_value(&manifest), value);
    }

    #[test]
    fn manifest_list() {
        let value = json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_IMAGE_MANIFEST_LIST,
            "manifests": [{
                "mediaType": MEDIA_TYPE_IMAGE_MANIFEST,
                "size": 7682,
                "digest": LAYER,
                "platform": {
                    "architecture": "ppc64le",
                    "os": "linux",
                    "os.version": "10.0.14393",
                    "os.features": ["win32k"],
                    "variant": "v8",
                    "features": ["sse4"]
                }
            }]
        });

        let list: ManifestList = from_value(&value).unwrap();
        let entry = &list.manifests[0];
        assert_eq!(entry.descriptor.size, 7682);
        assert_eq!(entry.platform.architecture, "ppc64le");
        assert_eq!(entry.platform.os_version, "10.0.14393");
        assert_eq!(entry.platform.os_features, vec!["win32k"]);
        assert_eq!(entry.platform.variant, "v8");
        assert_eq!(entry.platform.features, vec!["sse4"]);
        assert!(list.annotations.is_empty());

        let again: ManifestList = from_value(&to_value(&list)).unwrap();
        assert_eq!(again, list);
    }

    #[test]
    fn image() {
        let value = json!({
            "created": "2015-10-31T22:22:56.015925234Z",
            "author": "Alyssa P. Hacker <alyspdev@example.com>",
            "architecture": "amd64",
            "os": "linux",
            "config": {
                "User": "alice",
                "Memory": 2048,
                "MemorySwap": 4096,
                "CpuShares": 8,
                "ExposedPorts": {"8080/tcp": {}, "443/tcp": {}},
                "Env": ["PATH=/usr/local/sbin:/usr/local/bin", "FOO=bar"],
                "Entrypoint": ["/bin/my-app-binary"],
                "Cmd": ["--foreground", "--config", "/etc/my-app.d/default.cfg"],
                "Volumes": {"/var/job-result-data": {}, "/var/log/my-app-logs": {}},
                "WorkingDir": "/home/alice",
                "Labels": {"com.example.project.git.url": "https://example.com/project.git"}
            },
            "rootfs": {
                "diff_ids": [LAYER],
                "type": "layers"
            },
            "history": [
                {
                    "created": "2015-10-31T22:22:54.690851953Z",
                    "created_by": "/bin/sh -c #(nop) ADD file in /"
                },
                {
                    "created": "2015-10-31T22:22:55.613815829Z",
                    "created_by": "/bin/sh -c #(nop) CMD [\"sh\"]",
                    "empty_layer": true
                }
            ]
        });

        let image: Image = from_value(&value).unwrap();
        assert_eq!(image.config.memory_swap, 4096);
        assert_eq!(image.config.cmd.len(), 3);
        assert!(image.config.exposed_ports.contains(&"8080/tcp".to_string()));
        assert!(image.config.exposed_ports.contains(&"443/tcp".to_string()));
        assert_eq!(image.config.volumes.len(), 2);
        assert_eq!(image.rootfs.kind, "layers");
        assert_eq!(image.rootfs.diff_ids, vec![LAYER]);
        assert_eq!(image.history.len(), 2);
        assert!(!image.history[0].empty_layer);
        assert!(image.history[1].empty_layer);

        let again: Image = from_value(&to_value(&image)).unwrap();
        assert_eq!(again, image);
    }

    #[test]
    fn exposed_ports_are_object_keys() {
        let mut image = Image::default();
        image.config.exposed_ports.push("80/tcp".into());
        image.config.exposed_ports.push("443/tcp".into());

        let value = to_value(&image);
        assert_eq!(
            value["config"]["ExposedPorts"],
            json!({"80/tcp": {}, "443/tcp": {}})
        );

        let document = json!({"config": {"ExposedPorts": {"80/tcp": {}, "443/tcp": {}}}});
        let again: Image = from_value(&document).unwrap();
        assert_eq!(again.config.exposed_ports, image.config.exposed_ports);
    }

    #[test]
    fn descriptor_digest_must_be_a_string() {
        assert!(matches!(
            from_value::<Descriptor>(&json!({"digest": 123})),
            Err(Error::Validation { expected: "string", .. })
        ));

        let d: Descriptor = from_value(&json!({"digest": "sha256:abc"})).unwrap();
        assert_eq!(d.digest, "sha256:abc");
        assert!(d.validate().is_err());
    }

    #[test]
    fn descriptor_validate() {
        let d = Descriptor::new(MEDIA_TYPE_IMAGE_LAYER, Digest::compute(b"x"), 1);
        assert_eq!(d.validate().unwrap(), Digest::compute(b"x"));

        let negative = Descriptor { size: -1, ..d.clone() };
        assert!(matches!(negative.validate(), Err(Error::InvalidSize(-1))));

        let other = Descriptor {
            digest: "sha512:00".into(),
            ..d
        };
        assert!(matches!(other.validate(), Err(Error::UnsupportedDigest(..))));
    }

    #[test]
    fn ref_is_a_flat_descriptor() {
        let r = Ref::new(MEDIA_TYPE_IMAGE_MANIFEST, CONFIG, 42);
        assert_eq!(
            to_value(&r),
            json!({"mediaType": MEDIA_TYPE_IMAGE_MANIFEST, "digest": CONFIG, "size": 42})
        );
    }

    #[test]
    fn constructors_set_versioned() {
        let m = Manifest::new(Descriptor::default(), Vec::new());
        assert_eq!(m.versioned.schema_version, 2);
        assert_eq!(m.versioned.media_type, MEDIA_TYPE_IMAGE_MANIFEST);

        let l = ManifestList::new(Vec::new());
        assert_eq!(l.versioned.media_type, MEDIA_TYPE_IMAGE_MANIFEST_LIST);
    }
}
