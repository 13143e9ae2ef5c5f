use super::*;

/// Result of looking up an element a behavior depends on.
///
/// Behaviors branch on this instead of treating a missing element as an
/// error: an absent capability means the feature is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Present(NodeId),
    Absent { selector: String },
}

impl Capability {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Present(node) => Some(*node),
            Self::Absent { .. } => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl Page {
    /// First element in document order matching `selector`.
    ///
    /// Malformed or unsupported selectors are still errors.
    pub fn lookup(&self, selector: &str) -> Result<Capability> {
        Ok(match self.dom.query_selector(selector)? {
            Some(node) => Capability::Present(node),
            None => Capability::Absent {
                selector: selector.to_string(),
            },
        })
    }

    pub fn lookup_within(&self, root: NodeId, selector: &str) -> Result<Capability> {
        Ok(match self.dom.query_selector_from(root, selector)? {
            Some(node) => Capability::Present(node),
            None => Capability::Absent {
                selector: selector.to_string(),
            },
        })
    }

    pub fn lookup_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    /// Element with the given id. An empty id is always absent.
    pub fn lookup_id(&self, id: &str) -> Capability {
        match self.dom.by_id(id).filter(|_| !id.is_empty()) {
            Some(node) => Capability::Present(node),
            None => Capability::Absent {
                selector: format!("#{id}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_distinguishes_absent_from_malformed() -> Result<()> {
        let page = Page::from_html("<form class='form'><input id='email'></form>")?;
        assert!(page.lookup(".form")?.is_present());
        assert_eq!(
            page.lookup(".navbar")?,
            Capability::Absent {
                selector: ".navbar".into()
            }
        );
        assert!(page.lookup("a + b").is_err());
        Ok(())
    }

    #[test]
    fn lookup_within_only_searches_descendants() -> Result<()> {
        let page = Page::from_html(
            "<div id='a'><p class='x'>in</p></div><div id='b'></div><p class='x'>out</p>",
        )?;
        let a = page.select_one("#a")?;
        let b = page.select_one("#b")?;
        assert!(page.lookup_within(a, ".x")?.node().is_some());
        assert_eq!(page.lookup_within(b, ".x")?.node(), None);
        assert_eq!(page.lookup_all(".x")?.len(), 2);
        Ok(())
    }

    #[test]
    fn lookup_id_accepts_ids_that_are_not_valid_selectors() -> Result<()> {
        let page = Page::from_html("<section id='sobre-nós'></section>")?;
        assert!(page.lookup_id("sobre-nós").is_present());
        assert!(!page.lookup_id("").is_present());
        assert!(!page.lookup_id("missing").is_present());
        Ok(())
    }
}
