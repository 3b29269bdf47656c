use crate::pipeline::domain::{CandidateProfile, DegreeLevel, ExperienceLevel, JobPosting};

/// Catalog of skill terms recognized in posting text. Postings rarely list
/// requirements in a structured field, so extraction works off this catalog
/// plus whatever the candidate claims.
const SKILL_CATALOG: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "c++",
    "c#",
    "go",
    "rust",
    "ruby",
    "php",
    "swift",
    "kotlin",
    "scala",
    "html",
    "css",
    "sql",
    "react",
    "angular",
    "vue",
    "node",
    "django",
    "flask",
    "spring",
    "rails",
    "express",
    "fastapi",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "elasticsearch",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "terraform",
    "linux",
    "git",
    "graphql",
    "machine learning",
    "deep learning",
    "data analysis",
];

/// Synonym pairs counted as partial matches at half weight.
const SKILL_SYNONYMS: &[(&str, &[&str])] = &[
    ("javascript", &["js", "node", "nodejs", "node.js"]),
    ("python", &["django", "flask", "fastapi"]),
    ("react", &["reactjs", "react.js"]),
    ("typescript", &["ts"]),
    ("machine learning", &["ml", "deep learning", "ai"]),
    ("sql", &["mysql", "postgresql", "postgres", "database"]),
    ("kubernetes", &["k8s"]),
    ("aws", &["amazon web services"]),
];

pub(crate) struct SkillsBreakdown {
    pub score: f32,
    pub required: Vec<String>,
    pub exact: Vec<String>,
    pub partial: Vec<String>,
    pub missing: Vec<String>,
}

/// Skill terms a posting asks for: catalog hits in the requirements and
/// description text, lowercased and deduplicated.
pub(crate) fn required_terms(posting: &JobPosting) -> Vec<String> {
    let haystack = format!("{} {}", posting.requirements, posting.description).to_lowercase();
    let mut terms = Vec::new();
    for skill in SKILL_CATALOG {
        if contains_term(&haystack, skill) && !terms.iter().any(|t| t == skill) {
            terms.push((*skill).to_string());
        }
    }
    terms
}

/// Overlap ratio between candidate skills and required posting terms,
/// scaled to [0, 100]. Exact matches weigh 1.0, synonym matches 0.5. An
/// empty candidate skill set scores 0; a posting with no recognizable
/// required terms scores a neutral 50.
pub(crate) fn skills_score(profile: &CandidateProfile, posting: &JobPosting) -> SkillsBreakdown {
    let required = required_terms(posting);
    let candidate: Vec<String> = profile
        .skills
        .iter()
        .map(|skill| skill.trim().to_lowercase())
        .filter(|skill| !skill.is_empty())
        .collect();

    if candidate.is_empty() {
        return SkillsBreakdown {
            score: 0.0,
            missing: required.clone(),
            required,
            exact: Vec::new(),
            partial: Vec::new(),
        };
    }
    if required.is_empty() {
        return SkillsBreakdown {
            score: 50.0,
            required,
            exact: Vec::new(),
            partial: Vec::new(),
            missing: Vec::new(),
        };
    }

    let mut exact = Vec::new();
    let mut partial = Vec::new();
    let mut missing = Vec::new();
    for term in &required {
        if candidate.iter().any(|skill| skill == term) {
            exact.push(term.clone());
        } else if candidate.iter().any(|skill| synonyms(skill, term)) {
            partial.push(term.clone());
        } else {
            missing.push(term.clone());
        }
    }

    let raw = (exact.len() as f32 + 0.5 * partial.len() as f32) / required.len() as f32;
    SkillsBreakdown {
        score: (raw * 100.0).min(100.0),
        required,
        exact,
        partial,
        missing,
    }
}

/// Experience fit via ordinal distance between the posting's seniority token
/// and the candidate level: exact 100, one level off 60, further 20. A
/// posting with no seniority token is treated as open to any level.
pub(crate) fn experience_score(profile: &CandidateProfile, posting: &JobPosting) -> f32 {
    let Some(required) = required_level(posting) else {
        return 100.0;
    };
    let distance = profile
        .experience_level
        .ordinal()
        .abs_diff(required.ordinal());
    match distance {
        0 => 100.0,
        1 => 60.0,
        _ => 20.0,
    }
}

pub(crate) fn required_level(posting: &JobPosting) -> Option<ExperienceLevel> {
    let haystack = format!(
        "{} {} {}",
        posting.title, posting.requirements, posting.description
    )
    .to_lowercase();

    // Most specific tokens first so "senior" in a lead posting does not
    // shadow "lead".
    if ["lead", "principal", "staff"]
        .iter()
        .any(|t| contains_term(&haystack, t))
    {
        Some(ExperienceLevel::Lead)
    } else if contains_term(&haystack, "senior") || contains_term(&haystack, "sr") {
        Some(ExperienceLevel::Senior)
    } else if contains_term(&haystack, "mid-level") || contains_term(&haystack, "mid level") {
        Some(ExperienceLevel::Mid)
    } else if ["entry", "junior", "graduate", "intern"]
        .iter()
        .any(|t| contains_term(&haystack, t))
    {
        Some(ExperienceLevel::Entry)
    } else {
        None
    }
}

/// Education fit. No degree requirement in the posting scores 100. With a
/// requirement: a matching-or-higher degree scores 100, a lower degree 50,
/// no recorded education 0.
pub(crate) fn education_score(profile: &CandidateProfile, posting: &JobPosting) -> f32 {
    let Some(required) = required_degree(posting) else {
        return 100.0;
    };
    let best = profile.education.iter().map(|record| record.degree).max();
    match best {
        Some(degree) if degree >= required => 100.0,
        Some(_) => 50.0,
        None => 0.0,
    }
}

pub(crate) fn required_degree(posting: &JobPosting) -> Option<DegreeLevel> {
    let haystack = format!("{} {}", posting.requirements, posting.description).to_lowercase();
    if haystack.contains("phd") || haystack.contains("doctorate") {
        Some(DegreeLevel::Doctorate)
    } else if haystack.contains("master") {
        Some(DegreeLevel::Master)
    } else if haystack.contains("bachelor") || haystack.contains("b.s.") {
        Some(DegreeLevel::Bachelor)
    } else if haystack.contains("associate degree") {
        Some(DegreeLevel::Associate)
    } else {
        None
    }
}

fn synonyms(a: &str, b: &str) -> bool {
    SKILL_SYNONYMS.iter().any(|(canonical, variants)| {
        (*canonical == a && variants.contains(&b)) || (*canonical == b && variants.contains(&a))
    })
}

/// Whole-word containment so "go" does not match "golang careers" by way of
/// "category" or "r" match everything.
fn contains_term(haystack: &str, term: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(term) {
        let begin = start + pos;
        let end = begin + term.len();
        let before_ok = begin == 0
            || !haystack[..begin]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric());
        let after_ok = end >= haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = end;
    }
    false
}
