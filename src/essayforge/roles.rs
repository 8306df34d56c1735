//! The fixed research role catalog.
//!
//! A role is one specialised research perspective with its own prompt template. The
//! catalog always holds the same ten roles in the same order; a run's intensity selects
//! a prefix of it.
//!
//! # Example
//!
//! ```
//! use essayforge::roles::{select_roles, CATALOG_SIZE};
//!
//! let roles = select_roles(3);
//! assert_eq!(roles.len(), 3);
//! assert_eq!(roles[0].id, "fact-gatherer");
//! assert_eq!(select_roles(42).len(), CATALOG_SIZE);
//! ```

/// Number of roles in the catalog.
pub const CATALOG_SIZE: usize = 10;

/// Roles returned when the requested intensity is zero or negative.
pub const MIN_ROLES: usize = 2;

/// Placeholder replaced by the topic when a prompt is rendered.
const TOPIC_PLACEHOLDER: &str = "{topic}";

/// A single research perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDefinition {
    /// Stable kebab-case identifier, e.g. `"fact-gatherer"`.
    pub id: &'static str,
    /// One-line summary of what the role contributes.
    pub description: &'static str,
    /// Prompt with a `{topic}` placeholder.
    pub prompt_template: &'static str,
}

impl RoleDefinition {
    /// Substitute `topic` into the template.
    pub fn render_prompt(&self, topic: &str) -> String {
        self.prompt_template.replace(TOPIC_PLACEHOLDER, topic)
    }
}

static CATALOG: [RoleDefinition; CATALOG_SIZE] = [
    RoleDefinition {
        id: "fact-gatherer",
        description: "Gathers core facts and verifiable information",
        prompt_template: "You are a fact-gathering research agent. Your task is to research \"{topic}\" and provide:
1. Key facts and statistics
2. Verified information from reliable sources
3. Important definitions and concepts
4. Quantitative data points

Focus on accuracy and cite all sources. Output in markdown with proper citations.",
    },
    RoleDefinition {
        id: "current-state",
        description: "Analyzes current state and recent developments",
        prompt_template: "You are a current affairs research agent. Research the current state of \"{topic}\" including:
1. Latest developments and news
2. Current trends and patterns
3. Recent changes or updates
4. Present-day relevance and impact

Provide timely, up-to-date information with sources. Output in markdown.",
    },
    RoleDefinition {
        id: "expert-opinions",
        description: "Collects expert opinions and authoritative perspectives",
        prompt_template: "You are an expert opinion researcher. For the topic \"{topic}\", gather:
1. Opinions from recognized experts in the field
2. Academic perspectives
3. Industry leader insights
4. Consensus views and debates

Quote experts directly when possible and cite sources. Output in markdown.",
    },
    RoleDefinition {
        id: "historical-context",
        description: "Provides historical background and evolution",
        prompt_template: "You are a historical research agent. Provide historical context for \"{topic}\" including:
1. Origins and historical development
2. Key milestones and turning points
3. Evolution over time
4. Historical precedents and patterns

Focus on how the past informs the present. Output in markdown with citations.",
    },
    RoleDefinition {
        id: "counter-arguments",
        description: "Explores opposing views and criticisms",
        prompt_template: "You are a critical analysis agent. For \"{topic}\", research:
1. Common criticisms and counter-arguments
2. Alternative perspectives
3. Potential weaknesses or limitations
4. Opposing viewpoints and their merits

Be balanced and fair in presenting different sides. Output in markdown.",
    },
    RoleDefinition {
        id: "future-projections",
        description: "Analyzes future trends and projections",
        prompt_template: "You are a future trends analyst. For \"{topic}\", research and analyze:
1. Future projections and forecasts
2. Emerging trends and possibilities
3. Potential scenarios and outcomes
4. Expert predictions

Base projections on current data and expert analysis. Output in markdown.",
    },
    RoleDefinition {
        id: "case-studies",
        description: "Provides relevant case studies and examples",
        prompt_template: "You are a case study researcher. For \"{topic}\", provide:
1. Relevant case studies and real-world examples
2. Success stories and failures
3. Practical implementations
4. Lessons learned from specific cases

Focus on concrete examples with details. Output in markdown with sources.",
    },
    RoleDefinition {
        id: "data-analysis",
        description: "Performs data-driven analysis",
        prompt_template: "You are a data analysis agent. For \"{topic}\", provide:
1. Statistical analysis and data visualization descriptions
2. Quantitative trends and patterns
3. Data-driven insights
4. Comparative analysis with benchmarks

Focus on numbers and measurable outcomes. Output in markdown.",
    },
    RoleDefinition {
        id: "theoretical-framework",
        description: "Explores theoretical foundations and frameworks",
        prompt_template: "You are a theoretical research agent. For \"{topic}\", explore:
1. Theoretical frameworks and models
2. Academic theories and concepts
3. Philosophical underpinnings
4. Conceptual relationships

Connect theory to practical understanding. Output in markdown.",
    },
    RoleDefinition {
        id: "practical-applications",
        description: "Focuses on practical applications and implementations",
        prompt_template: "You are a practical applications researcher. For \"{topic}\", detail:
1. Real-world applications and uses
2. Implementation strategies
3. Best practices and guidelines
4. Practical considerations and challenges

Focus on actionable insights. Output in markdown.",
    },
];

/// The full catalog in its canonical order.
pub fn all() -> &'static [RoleDefinition] {
    &CATALOG
}

/// Look a role up by id.
pub fn get(id: &str) -> Option<&'static RoleDefinition> {
    CATALOG.iter().find(|role| role.id == id)
}

/// Catalog position of a role, if it exists.
pub fn position(id: &str) -> Option<usize> {
    CATALOG.iter().position(|role| role.id == id)
}

/// Select the first `intensity` roles.
///
/// - `intensity <= 0` selects the first [`MIN_ROLES`] roles.
/// - `intensity > 10` selects the whole catalog.
///
/// Selection is a deterministic prefix; nothing is shuffled.
pub fn select_roles(intensity: i64) -> &'static [RoleDefinition] {
    if intensity <= 0 {
        return &CATALOG[..MIN_ROLES];
    }
    let count = intensity.min(CATALOG_SIZE as i64) as usize;
    &CATALOG[..count]
}
