use crate::spec::SymbolCategory;
use serde::{Deserialize, Serialize};
use smartstring::alias::String;
use std::slice::Iter;

/// One symbol table entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolBean {
    pub kind: SymbolCategory,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SymbolBean {
    pub fn new(kind: SymbolCategory, name: &str) -> Self {
        Self {
            kind,
            name: name.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Display name, falling back to the internal name.
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Symbol beans addressed by index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolTable {
    vec: Vec<SymbolBean>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { vec: Vec::new() }
    }

    pub fn add(&mut self, bean: SymbolBean) -> usize {
        let idx = self.vec.len();
        self.vec.push(bean);
        idx
    }

    pub fn get(&self, idx: usize) -> Option<&SymbolBean> {
        self.vec.get(idx)
    }

    pub fn iter(&self) -> Iter<'_, SymbolBean> {
        self.vec.iter()
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn name(&self, idx: usize) -> Option<&str> {
        self.vec.get(idx).map(|bean| bean.name.as_str())
    }

    pub fn idx(&self, name: &str) -> Option<usize> {
        self.vec.iter().position(|bean| bean.name.as_str() == name)
    }
}

impl FromIterator<SymbolBean> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = SymbolBean>>(iter: I) -> Self {
        Self {
            vec: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let st = SymbolTable::new();
        assert!(st.is_empty());
        assert_eq!(st.idx("anything"), None);
        assert_eq!(st.name(0), None);
    }

    #[test]
    fn test_add_and_retrieve() {
        let mut st = SymbolTable::new();
        let i = st.add(SymbolBean::new(SymbolCategory::Terminal, "PLUS").with_display_name("'+'"));
        let j = st.add(SymbolBean::new(SymbolCategory::Nonterminal, "Expr"));
        assert_eq!((i, j), (0, 1));
        assert_eq!(st.idx("Expr"), Some(1));
        assert_eq!(st.get(0).unwrap().display(), "'+'");
        assert_eq!(st.get(1).unwrap().display(), "Expr");
        assert_eq!(st.len(), 2);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let st: SymbolTable = [SymbolBean::new(SymbolCategory::Production, "p0")].into_iter().collect();
        let json = serde_json::to_string(&st).unwrap();
        assert!(json.starts_with('['));
        let back: SymbolTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, st);
    }
}
