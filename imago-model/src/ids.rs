use std::fmt;
use std::str::FromStr;

#[cfg(feature = "bson")]
use bson::oid::ObjectId;

/// A 12-byte (96-bit) opaque identifier.
///
/// Mirrors the shape of a Mongo-style ObjectId: a 4-byte timestamp followed
/// by an 8-byte counter/process component. Collections, images, thumbnails
/// and cache renditions all key off this type so the id itself carries no
/// ownership or type information beyond "this thing was minted once".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OpaqueId(
    #[cfg(feature = "bson")]
    #[cfg_attr(feature = "serde", serde(with = "bson_oid_as_bytes"))]
    ObjectId,
    #[cfg(not(feature = "bson"))] [u8; 12],
);

impl OpaqueId {
    /// Mint a fresh id.
    #[cfg(feature = "bson")]
    pub fn new() -> Self {
        OpaqueId(ObjectId::new())
    }

    #[cfg(not(feature = "bson"))]
    pub fn new() -> Self {
        // Not cryptographically meaningful without the bson feature; callers
        // that need real uniqueness should enable it. Kept so the type is
        // usable by dependents that don't want the bson dependency at all.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let be = nanos.to_be_bytes();
        let mut bytes = [0u8; 12];
        let n = be.len().min(12);
        bytes[..n].copy_from_slice(&be[be.len() - n..]);
        OpaqueId(bytes)
    }

    pub fn as_bytes(&self) -> [u8; 12] {
        #[cfg(feature = "bson")]
        {
            self.0.bytes()
        }
        #[cfg(not(feature = "bson"))]
        {
            self.0
        }
    }

    #[cfg(feature = "bson")]
    pub fn as_object_id(&self) -> ObjectId {
        self.0
    }

    #[cfg(feature = "bson")]
    pub fn from_object_id(id: ObjectId) -> Self {
        OpaqueId(id)
    }
}

impl Default for OpaqueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for OpaqueId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[cfg(feature = "bson")]
        {
            ObjectId::parse_str(s)
                .map(OpaqueId)
                .map_err(|_| ParseIdError)
        }
        #[cfg(not(feature = "bson"))]
        {
            if s.len() != 24 {
                return Err(ParseIdError);
            }
            let mut bytes = [0u8; 12];
            for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
                let hex =
                    std::str::from_utf8(chunk).map_err(|_| ParseIdError)?;
                bytes[i] =
                    u8::from_str_radix(hex, 16).map_err(|_| ParseIdError)?;
            }
            Ok(OpaqueId(bytes))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseIdError;

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid opaque id")
    }
}

impl std::error::Error for ParseIdError {}

#[cfg(all(feature = "bson", feature = "serde"))]
mod bson_oid_as_bytes {
    use bson::oid::ObjectId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        id: &ObjectId,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        id.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<ObjectId, D::Error> {
        ObjectId::deserialize(d)
    }
}

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(
            feature = "serde",
            derive(serde::Serialize, serde::Deserialize)
        )]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub OpaqueId);

        impl $name {
            pub fn new() -> Self {
                $name(OpaqueId::new())
            }

            pub fn as_opaque(&self) -> OpaqueId {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                OpaqueId::from_str(s).map($name)
            }
        }

        impl From<OpaqueId> for $name {
            fn from(id: OpaqueId) -> Self {
                $name(id)
            }
        }
    };
}

typed_id!(CollectionId);
typed_id!(ImageId);
typed_id!(LibraryId);
typed_id!(JobId);

/// A library is a weak grouping of collections; this is never an owning
/// reference, only a back-pointer used for filtering and cascade-cleanup of
/// the paired scheduled job (see [`crate::scheduled_job::ScheduledJob`]).
pub type LibraryRef = LibraryId;
