//! Keyword arguments and prefix routing.
//!
//! A single flat mapping configures both halves of an encoder-decoder
//! model. Keys starting with `enc_` belong to the encoder, keys starting
//! with `dec_` belong to the decoder and all other keys are shared.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use candle_core::Tensor;
use serde_json::Value;
use snafu::{ResultExt, Snafu};

use crate::layers::attention::AttentionMask;

/// Flat keyword arguments.
pub type KwArgs<V> = BTreeMap<String, V>;

/// Key prefix that routes an argument to one half of the model.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrefixTag {
    Encoder,
    Decoder,
}

impl PrefixTag {
    /// The literal key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefixTag::Encoder => "enc_",
            PrefixTag::Decoder => "dec_",
        }
    }
}

/// Split keyword arguments on a key prefix.
///
/// Returns the arguments whose key starts with `prefix` (with the prefix
/// removed) and the remaining arguments (unchanged). Every argument ends
/// up in exactly one of the two mappings.
pub fn partition_by_prefix<V>(prefix: &str, kwargs: &KwArgs<V>) -> (KwArgs<V>, KwArgs<V>)
where
    V: Clone,
{
    let mut with_prefix = KwArgs::new();
    let mut rest = KwArgs::new();

    for (key, value) in kwargs {
        match key.strip_prefix(prefix) {
            Some(stripped) => with_prefix.insert(stripped.to_string(), value.clone()),
            None => rest.insert(key.clone(), value.clone()),
        };
    }

    (with_prefix, rest)
}

/// Prepend `prefix` to every key.
pub fn add_prefix<V>(prefix: &str, kwargs: KwArgs<V>) -> KwArgs<V> {
    kwargs
        .into_iter()
        .map(|(key, value)| (format!("{prefix}{key}"), value))
        .collect()
}

/// Keyword arguments routed to the encoder, the decoder, or both.
#[derive(Clone, Debug, PartialEq)]
pub struct EncDecKwArgs<V> {
    /// Arguments that had the `enc_` prefix, prefix removed.
    pub encoder: KwArgs<V>,

    /// Arguments that had the `dec_` prefix, prefix removed.
    pub decoder: KwArgs<V>,

    /// Arguments without a recognized prefix.
    pub shared: KwArgs<V>,
}

impl<V> EncDecKwArgs<V>
where
    V: Clone,
{
    /// Route keyword arguments.
    ///
    /// The encoder prefix is split off first, the decoder prefix is then
    /// split off the remainder. So, `enc_dec_x` is the encoder argument
    /// `dec_x`.
    pub fn partition(kwargs: &KwArgs<V>) -> Self {
        let (encoder, rest) = partition_by_prefix(PrefixTag::Encoder.as_str(), kwargs);
        let (decoder, shared) = partition_by_prefix(PrefixTag::Decoder.as_str(), &rest);

        log::trace!(
            "Routed keyword arguments: encoder {:?}, decoder {:?}, shared {:?}",
            encoder.keys().collect::<Vec<_>>(),
            decoder.keys().collect::<Vec<_>>(),
            shared.keys().collect::<Vec<_>>()
        );

        EncDecKwArgs {
            encoder,
            decoder,
            shared,
        }
    }
}

impl<V> EncDecKwArgs<V> {
    /// Restore the flat keyword arguments, re-adding the prefixes.
    pub fn into_kwargs(self) -> KwArgs<V> {
        let mut kwargs = self.shared;
        kwargs.extend(add_prefix(PrefixTag::Encoder.as_str(), self.encoder));
        kwargs.extend(add_prefix(PrefixTag::Decoder.as_str(), self.decoder));
        kwargs
    }
}

/// Per-call keyword argument.
#[derive(Clone, Debug)]
pub enum KwArg {
    Mask(AttentionMask),
    Tensor(Tensor),
    Value(Value),
}

impl KwArg {
    /// Short name of the argument kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            KwArg::Mask(_) => "mask",
            KwArg::Tensor(_) => "tensor",
            KwArg::Value(_) => "value",
        }
    }
}

impl From<AttentionMask> for KwArg {
    fn from(mask: AttentionMask) -> Self {
        KwArg::Mask(mask)
    }
}

impl From<Tensor> for KwArg {
    fn from(tensor: Tensor) -> Self {
        KwArg::Tensor(tensor)
    }
}

impl From<Value> for KwArg {
    fn from(value: Value) -> Self {
        KwArg::Value(value)
    }
}

impl From<bool> for KwArg {
    fn from(value: bool) -> Self {
        KwArg::Value(Value::Bool(value))
    }
}

/// Errors when loading keyword arguments.
#[derive(Debug, Snafu)]
pub enum LoadKwArgsError {
    #[snafu(display("Cannot open keyword arguments file: {}", path.to_string_lossy()))]
    OpenKwArgs {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("Cannot parse keyword arguments file: {}", path.to_string_lossy()))]
    ParseKwArgs {
        source: serde_json::Error,
        path: PathBuf,
    },
}

/// Load keyword arguments from a JSON file.
///
/// The file must contain a single flat JSON object, e.g.
/// `{"dim": 512, "enc_depth": 6, "dec_depth": 6}`.
pub fn load_kwargs(path: impl AsRef<Path>) -> Result<KwArgs<Value>, LoadKwArgsError> {
    let path = path.as_ref();
    let file = File::open(path).context(OpenKwArgsSnafu { path })?;
    serde_json::from_reader(BufReader::new(file)).context(ParseKwArgsSnafu { path })
}
