use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Header requirements collected while emitting. The variant order is
/// the emission order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum IncludeTag {
    Stdint,
    Stdbool,
    String,
    Stdatomic,
    Math,
    Isr,
    FloatStaticAssert,
}

impl IncludeTag {
    /// The `#include` line for this tag, or `None` when the tag emits
    /// something other than an include (`FloatStaticAssert`) or nothing
    /// at all (`Stdbool` in C++).
    pub fn include_line(&self, cpp: bool) -> Option<&'static str> {
        match (self, cpp) {
            (Self::Stdint, false) => Some("#include <stdint.h>"),
            (Self::Stdint, true) => Some("#include <cstdint>"),
            (Self::Stdbool, false) => Some("#include <stdbool.h>"),
            (Self::Stdbool, true) => None,
            (Self::String, false) => Some("#include <string.h>"),
            (Self::String, true) => Some("#include <cstring>"),
            (Self::Stdatomic, false) => Some("#include <stdatomic.h>"),
            (Self::Stdatomic, true) => Some("#include <atomic>"),
            (Self::Math, false) => Some("#include <math.h>"),
            (Self::Math, true) => Some("#include <cmath>"),
            (Self::Isr, _) => Some("#include \"isr.h\""),
            (Self::FloatStaticAssert, _) => None,
        }
    }
}

/// Deduplicated, deterministically ordered include requests.
#[derive(Debug, Clone, Default)]
pub struct IncludeSet {
    tags: BTreeSet<IncludeTag>,
}

impl IncludeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, tag: IncludeTag) {
        self.tags.insert(tag);
    }

    pub fn contains(&self, tag: IncludeTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn tags(&self) -> Vec<IncludeTag> {
        self.tags.iter().copied().collect()
    }

    /// Render the include block, standard headers first, then the float
    /// size assertions when requested.
    pub fn render(&self, cpp: bool) -> String {
        let mut out = String::new();
        for tag in &self.tags {
            if let Some(line) = tag.include_line(cpp) {
                out.push_str(line);
                out.push('\n');
            }
        }
        if self.tags.contains(&IncludeTag::FloatStaticAssert) {
            let keyword = if cpp { "static_assert" } else { "_Static_assert" };
            out.push_str(&format!(
                "{keyword}(sizeof(float) == 4U, \"float bit access requires 32-bit float\");\n"
            ));
            out.push_str(&format!(
                "{keyword}(sizeof(double) == 8U, \"double bit access requires 64-bit double\");\n"
            ));
        }
        out
    }
}
