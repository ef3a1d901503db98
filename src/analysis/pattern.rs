//! Dependency-name patterns shared by the stack and service rule tables

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Whole-name match (npm, PyPI, crates.io, gems)
    Exact,
    /// Leading segment match (Go module paths, Maven group ids, scoped npm packages)
    Prefix,
    /// Substring match (Maven `group:artifact` coordinates)
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyPattern {
    pub kind: PatternKind,
    pub pattern: &'static str,
}

impl DependencyPattern {
    pub const fn exact(pattern: &'static str) -> Self {
        Self {
            kind: PatternKind::Exact,
            pattern,
        }
    }

    pub const fn prefix(pattern: &'static str) -> Self {
        Self {
            kind: PatternKind::Prefix,
            pattern,
        }
    }

    pub const fn contains(pattern: &'static str) -> Self {
        Self {
            kind: PatternKind::Contains,
            pattern,
        }
    }

    /// Case-insensitive match against a dependency name
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        match self.kind {
            PatternKind::Exact => name == self.pattern,
            PatternKind::Prefix => name.starts_with(self.pattern),
            PatternKind::Contains => name.contains(self.pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_kinds() {
        assert!(DependencyPattern::exact("express").matches("Express"));
        assert!(!DependencyPattern::exact("express").matches("express-session"));
        assert!(DependencyPattern::prefix("github.com/labstack/echo").matches("github.com/labstack/echo/v4"));
        assert!(DependencyPattern::contains("spring-boot-starter")
            .matches("org.springframework.boot:spring-boot-starter-web"));
    }
}
