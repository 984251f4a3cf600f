/// Curated skill vocabulary. Extraction output follows this order.
pub const SKILL_VOCABULARY: &[&str] = &[
    "javascript",
    "typescript",
    "react",
    "vue",
    "angular",
    "node",
    "express",
    "python",
    "django",
    "flask",
    "java",
    "spring",
    "c#",
    ".net",
    "php",
    "laravel",
    "ruby",
    "rails",
    "golang",
    "rust",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "sql",
    "mongodb",
    "postgresql",
    "mysql",
    "nosql",
    "redis",
    "graphql",
    "rest",
    "html",
    "css",
    "sass",
    "less",
    "tailwind",
    "bootstrap",
    "material-ui",
    "git",
    "ci/cd",
    "jenkins",
    "github actions",
    "agile",
    "scrum",
    "jira",
    "figma",
    "adobe xd",
    "sketch",
    "photoshop",
    "illustrator",
    "ui",
    "ux",
    "responsive design",
    "mobile development",
    "react native",
    "flutter",
    "swift",
    "kotlin",
    "tensorflow",
    "pytorch",
    "machine learning",
    "ai",
    "data science",
    "data analysis",
    "data visualization",
    "power bi",
    "tableau",
    "devops",
    "sre",
    "security",
    "penetration testing",
    "ethical hacking",
];

/// Vocabulary entries occurring in `text` as case-insensitive substrings.
///
/// Plain substring containment: "javascript" also yields "java", and
/// "Node.js" yields "node".
pub fn extract_skills(text: &str) -> Vec<&'static str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let haystack = text.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .copied()
        .filter(|skill| haystack.contains(skill))
        .collect()
}
