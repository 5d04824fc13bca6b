#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use candle_core::{DType, Device, Tensor};
    use candle_nn::VarBuilder;
    use serde_json::Value;
    use snafu::{ResultExt, Whatever};

    use crate::architectures::{
        BuildDecoderAdapter, BuildEncoderAdapter, BuildSequenceModel, SequenceModel,
        SequenceModelInputs, SequenceModelOutput, TrainingModel,
    };
    use crate::error::BoxedError;
    use crate::kwargs::KwArgs;
    use crate::layers::attention::AttentionMask;
    use crate::models::reformer::ReformerLMConfig;

    /// Calls recorded by the stand-in models.
    pub type Calls = Rc<RefCell<Vec<RecordedCall>>>;

    /// A single call to a stand-in model.
    #[derive(Clone, Debug)]
    pub struct RecordedCall {
        pub name: &'static str,
        pub input: Tensor,
        pub inputs: SequenceModelInputs,
        pub return_loss: Option<bool>,
        pub seq_len: Option<usize>,
    }

    /// Get the recorded calls with the given name.
    pub fn calls_named(calls: &Calls, name: &str) -> Vec<RecordedCall> {
        calls
            .borrow()
            .iter()
            .filter(|call| call.name == name)
            .cloned()
            .collect()
    }

    /// Sequence model factory that builds models with all-zero outputs.
    ///
    /// Models configured to return embeddings record their calls as
    /// `encoder`, other models as `decoder`.
    #[derive(Debug, Default)]
    pub struct ZerosModelConfig {
        pub built: Rc<RefCell<Vec<ReformerLMConfig>>>,
        pub calls: Calls,
        pub always_logits: bool,
    }

    impl BuildSequenceModel for ZerosModelConfig {
        type Config = ReformerLMConfig;

        fn build(
            &self,
            config: &Self::Config,
            _vb: VarBuilder,
        ) -> Result<Box<dyn SequenceModel>, BoxedError> {
            self.built.borrow_mut().push(config.clone());
            Ok(Box::new(ZerosModel {
                calls: self.calls.clone(),
                dim: config.dim,
                n_pieces: config.num_tokens,
                return_embeddings: config.return_embeddings && !self.always_logits,
            }))
        }
    }

    struct ZerosModel {
        calls: Calls,
        dim: usize,
        n_pieces: usize,
        return_embeddings: bool,
    }

    impl SequenceModel for ZerosModel {
        fn forward_t(
            &self,
            input: &Tensor,
            inputs: &SequenceModelInputs,
            _train: bool,
        ) -> Result<SequenceModelOutput, BoxedError> {
            self.calls.borrow_mut().push(RecordedCall {
                name: if self.return_embeddings {
                    "encoder"
                } else {
                    "decoder"
                },
                input: input.clone(),
                inputs: inputs.clone(),
                return_loss: None,
                seq_len: None,
            });

            let (batch_size, seq_len) = input.dims2()?;
            if self.return_embeddings {
                Ok(SequenceModelOutput::Embeddings(Tensor::zeros(
                    (batch_size, seq_len, self.dim),
                    DType::F32,
                    input.device(),
                )?))
            } else {
                Ok(SequenceModelOutput::Logits(Tensor::zeros(
                    (batch_size, seq_len, self.n_pieces),
                    DType::F32,
                    input.device(),
                )?))
            }
        }
    }

    /// Sequence model factory that always fails.
    #[derive(Debug)]
    pub struct FailingModelConfig;

    impl BuildSequenceModel for FailingModelConfig {
        type Config = ReformerLMConfig;

        fn build(
            &self,
            config: &Self::Config,
            _vb: VarBuilder,
        ) -> Result<Box<dyn SequenceModel>, BoxedError> {
            Err(format!("Cannot build model with bucket size {}", config.bucket_size).into())
        }
    }

    /// Encoder adapter that returns the model as-is.
    ///
    /// Records the bucket size of every model that it wraps.
    #[derive(Debug, Default)]
    pub struct PassThroughAdapterConfig {
        pub wrapped: Rc<RefCell<Vec<usize>>>,
    }

    impl BuildEncoderAdapter for PassThroughAdapterConfig {
        type Config = ReformerLMConfig;

        fn wrap(
            &self,
            model: Box<dyn SequenceModel>,
            config: &Self::Config,
        ) -> Result<Box<dyn SequenceModel>, BoxedError> {
            self.wrapped.borrow_mut().push(config.bucket_size);
            Ok(model)
        }
    }

    /// Encoder and decoder adapter that always fails.
    #[derive(Debug)]
    pub struct FailingAdapterConfig;

    impl BuildEncoderAdapter for FailingAdapterConfig {
        type Config = ReformerLMConfig;

        fn wrap(
            &self,
            _model: Box<dyn SequenceModel>,
            config: &Self::Config,
        ) -> Result<Box<dyn SequenceModel>, BoxedError> {
            Err(format!("Cannot wrap model with bucket size {}", config.bucket_size).into())
        }
    }

    impl BuildDecoderAdapter for FailingAdapterConfig {
        type Config = ReformerLMConfig;

        fn wrap(
            &self,
            _model: Box<dyn SequenceModel>,
            config: &Self::Config,
        ) -> Result<Box<dyn TrainingModel>, BoxedError> {
            Err(format!("Cannot wrap model with bucket size {}", config.bucket_size).into())
        }
    }

    /// Decoder adapter that records training and generation calls.
    #[derive(Debug, Default)]
    pub struct RecordingTrainingConfig {
        pub calls: Calls,
    }

    impl BuildDecoderAdapter for RecordingTrainingConfig {
        type Config = ReformerLMConfig;

        fn wrap(
            &self,
            model: Box<dyn SequenceModel>,
            _config: &Self::Config,
        ) -> Result<Box<dyn TrainingModel>, BoxedError> {
            Ok(Box::new(RecordingTraining {
                calls: self.calls.clone(),
                model,
            }))
        }
    }

    struct RecordingTraining {
        calls: Calls,
        model: Box<dyn SequenceModel>,
    }

    impl TrainingModel for RecordingTraining {
        fn forward_t(
            &self,
            input: &Tensor,
            return_loss: bool,
            inputs: &SequenceModelInputs,
            train: bool,
        ) -> Result<SequenceModelOutput, BoxedError> {
            self.calls.borrow_mut().push(RecordedCall {
                name: "decoder.forward",
                input: input.clone(),
                inputs: inputs.clone(),
                return_loss: Some(return_loss),
                seq_len: None,
            });

            if return_loss {
                Ok(SequenceModelOutput::Loss(Tensor::new(0f32, input.device())?))
            } else {
                self.model.forward_t(input, inputs, train)
            }
        }

        fn generate(
            &self,
            start: &Tensor,
            seq_len: usize,
            inputs: &SequenceModelInputs,
        ) -> Result<Tensor, BoxedError> {
            self.calls.borrow_mut().push(RecordedCall {
                name: "decoder.generate",
                input: start.clone(),
                inputs: inputs.clone(),
                return_loss: None,
                seq_len: Some(seq_len),
            });

            let batch_size = start.dim(0)?;
            Ok(Tensor::zeros(
                (batch_size, seq_len),
                DType::U32,
                start.device(),
            )?)
        }
    }

    /// Convert a JSON object to keyword arguments.
    pub fn kwargs(value: Value) -> KwArgs<Value> {
        serde_json::from_value(value).expect("Keyword arguments must be a JSON object")
    }

    /// Piece identifiers of the given shape.
    pub fn pieces(batch_size: usize, seq_len: usize) -> Result<Tensor, Whatever> {
        Tensor::zeros((batch_size, seq_len), DType::U32, &Device::Cpu)
            .whatever_context("Cannot create piece tensor")
    }

    /// Attention mask from rows of booleans.
    pub fn mask(rows: &[&[u8]]) -> Result<AttentionMask, Whatever> {
        let seq_len = rows.first().map(|row| row.len()).unwrap_or(0);
        let flat = rows.concat();
        let tensor = Tensor::from_vec(flat, (rows.len(), seq_len), &Device::Cpu)
            .whatever_context("Cannot create mask tensor")?;
        AttentionMask::new(tensor).whatever_context("Cannot create attention mask")
    }

    /// Read back a mask as rows.
    pub fn mask_rows(mask: &AttentionMask) -> Vec<Vec<u8>> {
        mask.bool_mask()
            .to_vec2::<u8>()
            .expect("Cannot read back attention mask")
    }
}
