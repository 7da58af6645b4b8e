/// Fixed bucket count for the hash-vector similarity approximation. The
/// spec leaves the tokenizer and bucket count unspecified; both are fixed
/// here and reported in the audit record rather than left to drift.
pub const HASH_VECTOR_BUCKETS: usize = 2048;

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

fn bucket_for(token: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    (hash % HASH_VECTOR_BUCKETS as u64) as usize
}

/// Tokenizes `text` and counts occurrences into a fixed-width vector. The
/// mapping is a pure function of the input bytes, so hashing the same text
/// twice (or two permutations of the same token multiset) yields the same
/// vector.
pub fn hash_vector(text: &str) -> Vec<f64> {
    let mut vector = vec![0.0_f64; HASH_VECTOR_BUCKETS];
    for token in tokenize(&text.to_lowercase()) {
        vector[bucket_for(token)] += 1.0;
    }
    vector
}

/// Cosine similarity between two equal-length vectors; `0.0` when either is
/// the zero vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Deterministic, dependency-free approximation of nearest-neighbor
/// similarity between two extracted texts.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    cosine_similarity(&hash_vector(a), &hash_vector(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_hash_vector_round_trip_is_stable() {
        let v1 = hash_vector("the quick brown fox");
        let v2 = hash_vector("the quick brown fox");
        assert_eq!(v1, v2);
    }

    #[test]
    fn unit_hash_vector_is_invariant_to_token_order() {
        let v1 = hash_vector("alpha beta gamma");
        let v2 = hash_vector("gamma alpha beta");
        assert_eq!(v1, v2);
    }

    #[test]
    fn unit_identical_texts_have_similarity_one() {
        let sim = text_similarity("ship the feature", "ship the feature");
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unit_disjoint_texts_have_low_similarity() {
        let sim = text_similarity("alpha beta gamma", "zulu yankee xray");
        assert!(sim < 0.1);
    }
}
