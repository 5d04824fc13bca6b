use serde::{Deserialize, Serialize};

/// Reformer language model configuration.
///
/// Configuration of a single Reformer sequence model, as consumed by a
/// [BuildSequenceModel](crate::architectures::BuildSequenceModel)
/// implementation. Unknown keys are rejected when deserializing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReformerLMConfig {
    /// Add absolute position embeddings.
    pub absolute_position_emb: bool,

    /// Number of chunks to split attention computation into.
    pub attn_chunks: usize,

    /// Use axial position embeddings.
    pub axial_position_emb: bool,

    /// Shape of the axial position embeddings.
    pub axial_position_shape: Option<Vec<usize>>,

    /// Size of the locality-sensitive hashing buckets.
    pub bucket_size: usize,

    /// Use a causal mask, so that a position can only attend to itself
    /// and preceding positions.
    pub causal: bool,

    /// Number of reversible layers.
    pub depth: usize,

    /// Model width.
    pub dim: usize,

    /// Width of an attention head, `dim / heads` when unset.
    pub dim_head: Option<usize>,

    /// Embedding width, `dim` when unset.
    pub emb_dim: Option<usize>,

    /// Number of chunks to split feed-forward computation into.
    pub ff_chunks: usize,

    /// Feed-forward dropout probability.
    pub ff_dropout: f32,

    /// Use a gated linear unit in the feed-forward layers.
    pub ff_glu: bool,

    /// Feed-forward width as a multiple of `dim`.
    pub ff_mult: usize,

    /// Use sinusoidal rather than learned position embeddings.
    pub fixed_position_emb: bool,

    /// Sequences up to this length use full attention.
    pub full_attn_thres: usize,

    /// Number of attention heads.
    pub heads: usize,

    /// Layer dropout probability.
    pub layer_dropout: f32,

    /// Locality-sensitive hashing dropout probability.
    pub lsh_dropout: f32,

    /// Maximum sequence length.
    pub max_seq_len: usize,

    /// Number of locality-sensitive hashing rounds.
    pub n_hashes: usize,

    /// Number of heads that use local attention.
    pub n_local_attn_heads: usize,

    /// Number of memory key-values.
    pub num_mem_kv: usize,

    /// Vocabulary size.
    pub num_tokens: usize,

    /// Share a single value projection between heads.
    pub one_value_head: bool,

    /// Layers that use product-key memory.
    pub pkm_layers: Vec<usize>,

    /// Number of product-key memory keys.
    pub pkm_num_keys: usize,

    /// Dropout probability after attention.
    pub post_attn_dropout: f32,

    /// Draw random rotations per head.
    pub random_rotations_per_head: bool,

    /// Return hidden representations rather than logits.
    pub return_embeddings: bool,

    /// Sequences up to this length do not use reversible layers.
    pub reverse_thres: usize,

    /// Use ReZero residual scaling.
    pub use_rezero: bool,

    /// Use full attention rather than locality-sensitive hashing.
    pub use_full_attn: bool,

    /// Use scale normalization instead of layer normalization.
    pub use_scale_norm: bool,

    /// Share parameters between layers.
    pub weight_tie: bool,

    /// Tie input and output embeddings.
    pub weight_tie_embedding: bool,
}

impl Default for ReformerLMConfig {
    fn default() -> Self {
        Self {
            absolute_position_emb: false,
            attn_chunks: 1,
            axial_position_emb: false,
            axial_position_shape: None,
            bucket_size: 64,
            causal: false,
            depth: 6,
            dim: 512,
            dim_head: None,
            emb_dim: None,
            ff_chunks: 100,
            ff_dropout: 0.0,
            ff_glu: false,
            ff_mult: 4,
            fixed_position_emb: false,
            full_attn_thres: 0,
            heads: 8,
            layer_dropout: 0.0,
            lsh_dropout: 0.0,
            max_seq_len: 4096,
            n_hashes: 4,
            n_local_attn_heads: 0,
            num_mem_kv: 0,
            num_tokens: 256,
            one_value_head: false,
            pkm_layers: Vec::new(),
            pkm_num_keys: 128,
            post_attn_dropout: 0.0,
            random_rotations_per_head: false,
            return_embeddings: false,
            reverse_thres: 0,
            use_rezero: false,
            use_full_attn: false,
            use_scale_norm: false,
            weight_tie: false,
            weight_tie_embedding: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ReformerLMConfig;

    #[test]
    fn config_fills_in_defaults() {
        let config: ReformerLMConfig = serde_json::from_value(json!({"dim": 8, "causal": true}))
            .expect("Cannot deserialize configuration");
        assert_eq!(config.dim, 8);
        assert!(config.causal);
        assert_eq!(config.bucket_size, 64);
        assert_eq!(config.heads, 8);
        assert!(!config.return_embeddings);
    }

    #[test]
    fn config_rejects_unknown_keys() {
        let config = serde_json::from_value::<ReformerLMConfig>(json!({"dim": 8, "dimm": 8}));
        assert!(config.is_err());
    }
}
