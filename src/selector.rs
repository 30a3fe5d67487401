use rand::Rng;

use crate::catalog::QuoteEntry;
use crate::error::BotError;

/// Pick a quote for one recipient, uniformly at random.
///
/// Entries whose id appears in `recent` are excluded. When every entry is
/// recent the pick falls back to the whole catalog, so a recipient who has
/// seen everything still gets a quote, just a repeated one.
pub fn pick_quote<'a>(
    catalog: &'a [QuoteEntry],
    recent: &[String],
) -> Result<&'a QuoteEntry, BotError> {
    if catalog.is_empty() {
        return Err(BotError::EmptyCatalog);
    }

    let fresh: Vec<&QuoteEntry> = catalog
        .iter()
        .filter(|entry| !recent.contains(&entry.id))
        .collect();

    let mut rng = rand::thread_rng();
    if fresh.is_empty() {
        Ok(&catalog[rng.gen_range(0..catalog.len())])
    } else {
        Ok(fresh[rng.gen_range(0..fresh.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> QuoteEntry {
        QuoteEntry {
            id: id.to_string(),
            quote: format!("Quote {id}"),
            title: format!("Book {id}"),
            link: format!("/books/{id}"),
        }
    }

    #[test]
    fn test_never_picks_a_recent_quote_while_fresh_ones_remain() {
        let catalog: Vec<QuoteEntry> = (0..10).map(|i| entry(&format!("q{i}"))).collect();
        let recent: Vec<String> = vec!["q0".into(), "q3".into(), "q7".into()];

        for _ in 0..200 {
            let picked = pick_quote(&catalog, &recent).unwrap();
            assert!(!recent.contains(&picked.id));
        }
    }

    #[test]
    fn test_single_fresh_entry_is_always_picked() {
        let catalog = vec![entry("q1"), entry("q2"), entry("q3")];
        let recent: Vec<String> = vec!["q1".into(), "q3".into()];

        for _ in 0..50 {
            assert_eq!(pick_quote(&catalog, &recent).unwrap().id, "q2");
        }
    }

    #[test]
    fn test_falls_back_to_whole_catalog_when_everything_is_recent() {
        let catalog = vec![entry("q1"), entry("q2")];
        let recent: Vec<String> = vec!["q1".into(), "q2".into()];

        let picked = pick_quote(&catalog, &recent).unwrap();
        assert!(catalog.iter().any(|e| e.id == picked.id));
    }

    #[test]
    fn test_empty_catalog_is_an_error() {
        let recent: Vec<String> = Vec::new();
        let err = pick_quote(&[], &recent).unwrap_err();
        assert!(matches!(err, BotError::EmptyCatalog));
    }
}
