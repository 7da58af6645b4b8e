//! Similarity & pair mining and LLM-driven patch synthesis: the guided
//! mutation half of the optimizer, bridging the distributional evaluator's
//! scored runs to contrastive pairs and textual patch candidates.

pub mod pair_miner;
pub mod patch_synthesizer;
pub mod similarity;

pub use pair_miner::{mine_pairs, PairMinerConfig};
pub use patch_synthesizer::{synthesize, PatchSynthesizerConfig};
pub use similarity::{cosine_similarity, hash_vector, text_similarity, HASH_VECTOR_BUCKETS};
