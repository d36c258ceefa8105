use serde::{Deserialize, Serialize};

/// One (instruction, input image, output image) evaluation unit.
///
/// Identity is structural: two pairs read from different files with the same three
/// strings are the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    pub instruction: String,
    pub input_image: String,
    pub output_image: String,
}

impl Pair {
    pub fn new(
        instruction: impl Into<String>,
        input_image: impl Into<String>,
        output_image: impl Into<String>,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            input_image: input_image.into(),
            output_image: output_image.into(),
        }
    }
}

/// One line of a benchmark JSONL file.
///
/// Unknown fields are kept in `extra` so records can be echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub instruction: String,
    pub input_images: Vec<String>,
    pub output_images: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PairRecord {
    /// The input reference used for scoring (first listed input image).
    pub fn input_image(&self) -> Option<&str> {
        self.input_images.first().map(String::as_str)
    }

    /// One pair per output image, in output order.
    ///
    /// Empty when the record has no input image.
    pub fn pairs(&self) -> Vec<Pair> {
        let Some(input) = self.input_image() else {
            return Vec::new();
        };
        self.output_images
            .iter()
            .map(|output| Pair::new(&self.instruction, input, output))
            .collect()
    }
}
