use std::collections::HashMap;

/// A prefix tree keyed by path segments.
///
/// `contains` terminates successfully either when the query is fully
/// consumed at some node, or when it reaches a node with no children
/// (a "leaf" of whatever was inserted) before the query is exhausted. This
/// lets a single inserted prefix (e.g. a depth-limited directory walk that
/// only recorded `host/owner`) answer `contains` for deeper queries
/// (`host/owner/repo/internal`) that were never directly inserted.
#[derive(Debug, Default)]
pub struct PathTrie {
    children: HashMap<String, PathTrie>,
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S]) {
        let mut node = self;
        for segment in segments {
            node = node
                .children
                .entry(segment.as_ref().to_string())
                .or_default();
        }
    }

    pub fn contains<S: AsRef<str>>(&self, segments: &[S]) -> bool {
        if segments.is_empty() {
            return false;
        }

        let mut node = self;
        for (i, segment) in segments.iter().enumerate() {
            let Some(child) = node.children.get(segment.as_ref()) else {
                return false;
            };

            if child.children.is_empty() || i == segments.len() - 1 {
                return true;
            }

            node = child;
        }

        // unreachable: the loop above always returns once the last
        // segment is consumed.
        false
    }
}

#[cfg(test)]
mod test {
    use super::PathTrie;
    use pretty_assertions::assert_eq;

    fn segs(s: &str) -> Vec<&str> {
        s.split('/').collect()
    }

    #[test]
    fn contains_exact_insert() {
        let mut trie = PathTrie::new();
        trie.insert(&segs("github.com/foo/bar"));

        assert!(trie.contains(&segs("github.com/foo/bar")));
    }

    #[test]
    fn contains_longer_query_through_a_leaf() {
        let mut trie = PathTrie::new();
        trie.insert(&segs("github.com/foo/bar"));

        assert!(trie.contains(&segs("github.com/foo/bar/internal/sub")));
    }

    #[test]
    fn diverging_path_is_not_contained() {
        let mut trie = PathTrie::new();
        trie.insert(&segs("github.com/foo/bar"));

        assert!(!trie.contains(&segs("github.com/foo/baz")));
        assert!(!trie.contains(&segs("gitlab.com/foo/bar")));
    }

    #[test]
    fn empty_query_is_never_contained() {
        let trie = PathTrie::new();
        let empty: Vec<&str> = Vec::new();
        assert!(!trie.contains(&empty));
    }

    #[test]
    fn fully_consumed_query_is_contained_even_with_siblings() {
        let mut trie = PathTrie::new();
        trie.insert(&segs("host/owner/repo-a"));
        trie.insert(&segs("host/owner/repo-b"));

        // Fully consuming the query always terminates true, even though
        // `owner` still has other children (repo-a, repo-b).
        assert!(trie.contains(&segs("host/owner")));
        assert!(trie.contains(&segs("host/owner/repo-a")));
        assert_eq!(trie.contains(&segs("host/owner/repo-c")), false);
    }
}
