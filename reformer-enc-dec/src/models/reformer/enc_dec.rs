use candle_core::Tensor;
use candle_nn::VarBuilder;
use serde_json::{Map, Value};
use snafu::{ensure, OptionExt, ResultExt, Snafu};

use crate::architectures::{
    BuildArchitecture, BuildDecoderAdapter, BuildEncoderAdapter, BuildSequenceModel,
    SequenceModel, SequenceModelInputs, SequenceModelInputsError, SequenceModelOutput,
    TrainingModel,
};
use crate::error::BoxedError;
use crate::kwargs::{EncDecKwArgs, KwArg, KwArgs};
use crate::models::reformer::ReformerLMConfig;

const BUCKET_SIZE: &str = "bucket_size";
const DIM: &str = "dim";
const KEYS: &str = "keys";
const RETURN_EMBEDDINGS: &str = "return_embeddings";
const RETURN_LOSS: &str = "return_loss";

/// Encoder bucket size when none is given.
pub const DEFAULT_ENCODER_BUCKET_SIZE: usize = 64;

/// Reformer encoder-decoder configuration errors.
#[derive(Debug, Snafu)]
pub enum ReformerEncDecConfigError {
    #[snafu(display("Decoder bucket size overflows, encoder bucket size is {bucket_size}"))]
    BucketSizeOverflow { bucket_size: usize },

    #[snafu(display("Cannot deserialize {group} configuration"))]
    DeserializeConfig {
        source: serde_json::Error,
        group: &'static str,
    },

    #[snafu(display("Cannot set '{key}' for the {group}: {reason}"))]
    ForbiddenKey {
        group: &'static str,
        key: String,
        reason: &'static str,
    },

    #[snafu(display("Model width must be set using the shared 'dim' key"))]
    MissingDim,
}

/// Reformer encoder-decoder configuration.
///
/// Holds the resolved configurations of the encoder and the decoder, plus
/// the factory and adapters that are used to construct them.
#[derive(Debug)]
pub struct ReformerEncDecConfig {
    decoder: ReformerLMConfig,
    decoder_adapter: Box<dyn BuildDecoderAdapter<Config = ReformerLMConfig>>,
    encoder: ReformerLMConfig,
    encoder_adapter: Box<dyn BuildEncoderAdapter<Config = ReformerLMConfig>>,
    sequence_model: Box<dyn BuildSequenceModel<Config = ReformerLMConfig>>,
}

impl ReformerEncDecConfig {
    /// Resolve an encoder-decoder configuration from keyword arguments.
    ///
    /// Keys prefixed with `enc_` configure the encoder, keys prefixed with
    /// `dec_` the decoder. Unprefixed keys are shared, prefixed keys take
    /// precedence over them. The model width must be given once as the
    /// shared `dim` key.
    ///
    /// The encoder always returns embeddings. Its bucket size defaults to
    /// `64`, the decoder bucket size defaults to twice the encoder bucket
    /// size.
    ///
    /// * `kwargs` - Flat keyword arguments.
    /// * `sequence_model` - Factory for the encoder and decoder models.
    /// * `encoder_adapter` - Adapter that normalizes encoder inputs of
    ///   arbitrary length, such as a padding adapter.
    /// * `decoder_adapter` - Adapter that adds training and generation to
    ///   the decoder.
    pub fn from_kwargs(
        kwargs: &KwArgs<Value>,
        sequence_model: Box<dyn BuildSequenceModel<Config = ReformerLMConfig>>,
        encoder_adapter: Box<dyn BuildEncoderAdapter<Config = ReformerLMConfig>>,
        decoder_adapter: Box<dyn BuildDecoderAdapter<Config = ReformerLMConfig>>,
    ) -> Result<Self, ReformerEncDecConfigError> {
        let EncDecKwArgs {
            mut encoder,
            mut decoder,
            shared,
        } = EncDecKwArgs::partition(kwargs);

        for key in [RETURN_EMBEDDINGS, "return_embedding"] {
            ensure!(
                !encoder.contains_key(key),
                ForbiddenKeySnafu {
                    group: "encoder",
                    key,
                    reason: "the encoder always returns embeddings",
                }
            );
        }

        ensure!(shared.contains_key(DIM), MissingDimSnafu);

        for (group, kwargs) in [("encoder", &encoder), ("decoder", &decoder)] {
            ensure!(
                !kwargs.contains_key(DIM),
                ForbiddenKeySnafu {
                    group,
                    key: DIM,
                    reason: "the width is shared, set it using 'dim'",
                }
            );
        }

        for (key, value) in &shared {
            encoder
                .entry(key.clone())
                .or_insert_with(|| value.clone());
            decoder
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        encoder.insert(RETURN_EMBEDDINGS.to_string(), Value::Bool(true));
        encoder
            .entry(BUCKET_SIZE.to_string())
            .or_insert_with(|| DEFAULT_ENCODER_BUCKET_SIZE.into());
        let encoder = parse_config(encoder, "encoder")?;

        // The decoder default depends on the resolved encoder bucket size.
        if !decoder.contains_key(BUCKET_SIZE) {
            let bucket_size = encoder.bucket_size;
            let decoder_bucket_size = bucket_size
                .checked_mul(2)
                .context(BucketSizeOverflowSnafu { bucket_size })?;
            decoder.insert(BUCKET_SIZE.to_string(), decoder_bucket_size.into());
        }
        let decoder = parse_config(decoder, "decoder")?;

        log::debug!(
            "Resolved Reformer encoder-decoder: dim {}, encoder bucket size {}, decoder bucket size {}",
            encoder.dim,
            encoder.bucket_size,
            decoder.bucket_size
        );

        Ok(Self {
            decoder,
            decoder_adapter,
            encoder,
            encoder_adapter,
            sequence_model,
        })
    }

    /// Resolved decoder configuration.
    pub fn decoder_config(&self) -> &ReformerLMConfig {
        &self.decoder
    }

    /// Resolved encoder configuration.
    pub fn encoder_config(&self) -> &ReformerLMConfig {
        &self.encoder
    }

    /// Decoder adapter.
    pub fn decoder_adapter(
        mut self,
        decoder_adapter: Box<dyn BuildDecoderAdapter<Config = ReformerLMConfig>>,
    ) -> Self {
        self.decoder_adapter = decoder_adapter;
        self
    }

    /// Encoder adapter.
    pub fn encoder_adapter(
        mut self,
        encoder_adapter: Box<dyn BuildEncoderAdapter<Config = ReformerLMConfig>>,
    ) -> Self {
        self.encoder_adapter = encoder_adapter;
        self
    }

    /// Factory for the encoder and decoder models.
    pub fn sequence_model(
        mut self,
        sequence_model: Box<dyn BuildSequenceModel<Config = ReformerLMConfig>>,
    ) -> Self {
        self.sequence_model = sequence_model;
        self
    }
}

fn parse_config(
    kwargs: KwArgs<Value>,
    group: &'static str,
) -> Result<ReformerLMConfig, ReformerEncDecConfigError> {
    serde_json::from_value(Value::Object(kwargs.into_iter().collect::<Map<_, _>>()))
        .context(DeserializeConfigSnafu { group })
}

impl BuildArchitecture for ReformerEncDecConfig {
    type Architecture = ReformerEncDec;

    fn build(&self, vb: VarBuilder) -> Result<Self::Architecture, BoxedError> {
        let encoder = self
            .sequence_model
            .build(&self.encoder, vb.push_prefix("encoder"))?;
        let encoder = self.encoder_adapter.wrap(encoder, &self.encoder)?;

        let decoder = self
            .sequence_model
            .build(&self.decoder, vb.push_prefix("decoder"))?;
        let decoder = self.decoder_adapter.wrap(decoder, &self.decoder)?;

        Ok(ReformerEncDec { decoder, encoder })
    }
}

/// Reformer encoder-decoder errors.
#[derive(Debug, Snafu)]
pub enum ReformerEncDecError {
    #[snafu(display("Invalid decoder argument"))]
    DecoderArguments { source: SequenceModelInputsError },

    #[snafu(display("Invalid encoder argument"))]
    EncoderArguments { source: SequenceModelInputsError },

    #[snafu(display("Encoder did not return embeddings"))]
    NoEncoderEmbeddings,

    #[snafu(display("Argument '{name}' is set by the encoder-decoder and cannot be passed"))]
    ReservedArgument { name: &'static str },
}

/// Reformer encoder-decoder.
///
/// The encoder embeds the input sequence, the decoder attends to these
/// embeddings while predicting or generating the output sequence.
///
/// Both entry points take keyword arguments that are routed in the same
/// way as the configuration: `enc_` arguments go to the encoder, `dec_`
/// arguments to the decoder. Recognized arguments are `input_mask` and
/// `context_mask`, other arguments are passed through as-is.
pub struct ReformerEncDec {
    decoder: Box<dyn TrainingModel>,
    encoder: Box<dyn SequenceModel>,
}

impl ReformerEncDec {
    /// Predict the output sequence.
    ///
    /// Returns the output of the decoder, the loss when `return_loss` is
    /// set. The decoder context mask defaults to the encoder input mask.
    /// Unprefixed arguments are not used.
    ///
    /// * `seq_in` - Input sequence.
    ///   *Shape:* `(batch_size, seq_in_len)`
    /// * `seq_out` - Output sequence.
    ///   *Shape:* `(batch_size, seq_out_len)`
    /// * `return_loss` - Return the loss rather than the prediction.
    /// * `kwargs` - Prefixed encoder and decoder arguments.
    /// * `train` - Whether to train the model.
    pub fn forward_t(
        &self,
        seq_in: &Tensor,
        seq_out: &Tensor,
        return_loss: bool,
        kwargs: &KwArgs<KwArg>,
        train: bool,
    ) -> Result<SequenceModelOutput, BoxedError> {
        let EncDecKwArgs {
            encoder, decoder, ..
        } = EncDecKwArgs::partition(kwargs);

        for name in [KEYS, RETURN_LOSS] {
            ensure!(!decoder.contains_key(name), ReservedArgumentSnafu { name });
        }

        let encoder_inputs =
            SequenceModelInputs::try_from(encoder).context(EncoderArgumentsSnafu)?;
        let mut decoder_inputs =
            SequenceModelInputs::try_from(decoder).context(DecoderArgumentsSnafu)?;

        decoder_inputs.keys = Some(self.encode(seq_in, &encoder_inputs, train)?);
        if decoder_inputs.context_mask.is_none() {
            decoder_inputs.context_mask = encoder_inputs.input_mask;
        }

        self.decoder
            .forward_t(seq_out, return_loss, &decoder_inputs, train)
    }

    /// Generate an output sequence.
    ///
    /// Unprefixed arguments are passed to the decoder together with the
    /// decoder arguments and take precedence over them.
    ///
    /// * `seq_in` - Input sequence.
    ///   *Shape:* `(batch_size, seq_in_len)`
    /// * `seq_out_start` - Start of the output sequence.
    ///   *Shape:* `(batch_size, start_len)`
    /// * `seq_len` - Number of pieces to generate.
    /// * `kwargs` - Encoder, decoder and generation arguments.
    ///
    /// Returns the generated pieces.
    /// *Shape:* `(batch_size, seq_len)`
    pub fn generate(
        &self,
        seq_in: &Tensor,
        seq_out_start: &Tensor,
        seq_len: usize,
        kwargs: &KwArgs<KwArg>,
    ) -> Result<Tensor, BoxedError> {
        let EncDecKwArgs {
            encoder,
            mut decoder,
            shared,
        } = EncDecKwArgs::partition(kwargs);
        decoder.extend(shared);

        ensure!(
            !decoder.contains_key(KEYS),
            ReservedArgumentSnafu { name: KEYS }
        );

        let encoder_inputs =
            SequenceModelInputs::try_from(encoder).context(EncoderArgumentsSnafu)?;
        let mut decoder_inputs =
            SequenceModelInputs::try_from(decoder).context(DecoderArgumentsSnafu)?;

        decoder_inputs.keys = Some(self.encode(seq_in, &encoder_inputs, false)?);

        self.decoder
            .generate(seq_out_start, seq_len, &decoder_inputs)
    }

    fn encode(
        &self,
        seq_in: &Tensor,
        inputs: &SequenceModelInputs,
        train: bool,
    ) -> Result<Tensor, BoxedError> {
        match self.encoder.forward_t(seq_in, inputs, train)? {
            SequenceModelOutput::Embeddings(embeddings) => Ok(embeddings),
            _ => Err(NoEncoderEmbeddingsSnafu.build().into()),
        }
    }
}
