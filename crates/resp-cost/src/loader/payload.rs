use crate::{DataKind, IdentGenerator, Result, Store, WorkloadSpec};
use rand::Rng;
use std::sync::Arc;

/// What gets written under every key.
///
/// Sub-elements depend only on their position, never on the key, so they are
/// generated once per load and shared by all workers. String values are the
/// exception: each `SET` gets fresh random bytes.
pub(crate) enum Payload {
    Value { size: usize },
    Hash(Vec<(Arc<str>, Arc<str>)>),
    List(Vec<Arc<str>>),
    Set(Vec<Arc<str>>),
    ZSet(Vec<(f64, Arc<str>)>),
}

impl Payload {
    pub fn build(spec: &WorkloadSpec, idents: &IdentGenerator) -> Self {
        let members = || -> Vec<Arc<str>> {
            (0..spec.field_count)
                .map(|j| idents.generate(j, spec.value_size))
                .collect()
        };

        match spec.kind {
            DataKind::String => Self::Value {
                size: spec.value_size,
            },
            DataKind::Hash => Self::Hash(
                (0..spec.field_count)
                    .map(|j| {
                        (
                            idents.generate(j, spec.field_size),
                            idents.generate(j, spec.value_size),
                        )
                    })
                    .collect(),
            ),
            DataKind::List => Self::List(members()),
            DataKind::Set => Self::Set(members()),
            DataKind::ZSet => Self::ZSet(
                members()
                    .into_iter()
                    .enumerate()
                    .map(|(j, member)| (j as f64, member))
                    .collect(),
            ),
        }
    }

    /// Issues the single write that materializes `key`.
    pub async fn write<S: Store>(&self, store: &S, key: &str) -> Result<()> {
        match self {
            Self::Value { size } => {
                let value = random_value(*size);
                store.set(key, &value).await
            }
            Self::Hash(fields) => store.hset(key, fields).await,
            Self::List(elements) => store.rpush(key, elements).await,
            Self::Set(members) => store.sadd(key, members).await,
            Self::ZSet(members) => store.zadd(key, members).await,
        }
    }
}

/// `size` random lowercase ASCII letters.
pub(crate) fn random_value(size: usize) -> String {
    let mut rng = rand::rng();
    (0..size)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}
