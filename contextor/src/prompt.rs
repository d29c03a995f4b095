//! Prompt builders for rewriting, intent classification and answers.

use reranker::RankedResult;

use crate::{conversation::Turn, query::Intent};

/// System message for the answer model.
pub const ANSWER_SYSTEM: &str = r#"
You are an expert product consultant for an online store catalogue.
Advise with concrete data, not sales talk. Answer in the language of the user.
- Read each product's technical details and pull out key specs (RAM, material, size, connectivity, ...).
- Use Markdown: **bold** for key features, bullet lists for specs.
- Explain why each product matches what the user asked for.
- When several products are shown, add a short comparison.
- If the description is thin, say the technical information is limited. Never invent data.
"#;

/// Instruction for standalone query rewriting.
pub fn build_rewrite_prompt(current: &str, window: &[Turn]) -> String {
    format!(
        r#"Rewrite the user's latest message as a standalone product search query.

Recent conversation:
{history}

Latest message: "{current}"

Rules, in priority order:
1. Object persistence: if the message only gives an attribute (price, color, brand, size), apply it to the product being discussed.
   Example: history "Busco laptops", message "que sea HP" -> laptops HP
2. Topic switch: if the message names a new product, drop earlier attributes that no longer apply.
   Example: history "zapatos rojos", message "busco cables" -> cables
3. If the history does not help, return the message unchanged.

Reply with the search query only, on one line, without explanations."#,
        history = render_history(window),
        current = current.trim(),
    )
}

/// Instruction for SEARCH/DETAILS classification.
pub fn build_intent_prompt(query: &str) -> String {
    format!(
        r#"Classify the user's intent. User: "{query}"

Reply with exactly one word:
- SEARCH: the user wants to find, filter or see other products or change features (e.g. "busca X", "más baratos", "en azul").
- DETAILS: the user asks about products that were already shown (e.g. "¿cuál tiene más RAM?", "¿por qué recomiendas ese?", "explícame el precio")."#,
        query = query.trim(),
    )
}

/// User prompt for the answer model: history, grounding products, question.
///
/// Each product description is cut to `max_desc_chars` characters.
pub fn build_answer_prompt(
    query: &str,
    intent: Intent,
    products: &[RankedResult],
    history: &[String],
    max_desc_chars: usize,
) -> String {
    let mut out = String::new();

    out.push_str("Conversation so far:\n");
    if history.is_empty() {
        out.push_str("(none)\n");
    } else {
        for line in history {
            out.push_str(line);
            out.push('\n');
        }
    }

    out.push_str("\nProducts");
    out.push_str(match intent {
        Intent::Search => " found for this search:\n",
        Intent::Details => " already shown to the user:\n",
    });
    if products.is_empty() {
        out.push_str("(no products available; say so and suggest refining the search)\n");
    }
    for (i, p) in products.iter().enumerate() {
        let meta = &p.candidate.metadata;
        let desc: String = match meta.descriptive_text.trim() {
            "" => "No detailed description".to_string(),
            text => text.chars().take(max_desc_chars).collect(),
        };
        out.push_str(&format!(
            "--- PRODUCT {n} ---\nID: {id}\nName: {title}\nPrice: {price}\nDetails: {desc}\n",
            n = i + 1,
            id = p.candidate.id,
            title = meta.title,
            price = meta.price.as_deref().unwrap_or("ask"),
        ));
    }

    out.push_str(&format!("\nUser question: \"{}\"\n", query.trim()));
    if intent == Intent::Details {
        out.push_str("Answer only about the products listed above.\n");
    }
    out
}

/// Normalizes a raw rewrite answer; `None` when nothing usable remains.
///
/// Drops `<think>` blocks, quotes and a leading `Search query:` label, then
/// keeps the first non-empty line.
pub fn clean_rewrite(raw: &str) -> Option<String> {
    let mut text = raw.to_string();
    while let Some(start) = text.find("<think>") {
        match text[start..].find("</think>") {
            Some(end) => text.replace_range(start..start + end + "</think>".len(), ""),
            None => text.truncate(start),
        }
    }

    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line: String = line
        .chars()
        .filter(|c| !matches!(c, '"' | '“' | '”' | '`'))
        .collect();
    let line = line.trim();
    let line = strip_label(line, "search query:").trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// DETAILS iff the answer mentions it; anything else is SEARCH.
pub fn parse_intent(raw: &str) -> Intent {
    if raw.to_uppercase().contains("DETAILS") {
        Intent::Details
    } else {
        Intent::Search
    }
}

fn strip_label<'a>(s: &'a str, label: &str) -> &'a str {
    match s.get(..label.len()) {
        Some(head) if head.eq_ignore_ascii_case(label) => &s[label.len()..],
        _ => s,
    }
}

fn render_history(window: &[Turn]) -> String {
    if window.is_empty() {
        return "(none)".to_string();
    }
    window
        .iter()
        .map(Turn::as_prompt_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use product_store::{Candidate, ProductMetadata};

    #[test]
    fn rewrite_cleanup() {
        assert_eq!(clean_rewrite("  \"laptops HP\"  ").as_deref(), Some("laptops HP"));
        assert_eq!(
            clean_rewrite("Search query: cables\nbecause...").as_deref(),
            Some("cables")
        );
        assert_eq!(
            clean_rewrite("<think>user wants HP</think>\nlaptops HP").as_deref(),
            Some("laptops HP")
        );
        assert_eq!(clean_rewrite(" \n \"\" "), None);
        assert_eq!(clean_rewrite("<think>never closed"), None);
    }

    #[test]
    fn intent_parsing_defaults_to_search() {
        assert_eq!(parse_intent("details"), Intent::Details);
        assert_eq!(parse_intent("DETAILS."), Intent::Details);
        assert_eq!(parse_intent("SEARCH"), Intent::Search);
        assert_eq!(parse_intent("no idea"), Intent::Search);
    }

    #[test]
    fn rewrite_prompt_carries_history_and_examples() {
        let h = vec![Turn::user(Some("Busco laptops".into()), None)];
        let p = build_rewrite_prompt("que sea HP", &h);
        assert!(p.contains("user: Busco laptops"));
        assert!(p.contains("\"que sea HP\""));
        assert!(p.contains("laptops HP"));
    }

    #[test]
    fn answer_prompt_lists_products_in_order() {
        let mk = |id: &str, title: &str| RankedResult {
            candidate: Candidate {
                id: id.into(),
                score: 0.5,
                metadata: ProductMetadata {
                    title: title.into(),
                    price: Some("$10".into()),
                    ..Default::default()
                },
            },
            score: 0.5,
            rerank_score: Some(1.0),
        };
        let p = build_answer_prompt(
            "cables",
            Intent::Search,
            &[mk("a", "Cable A"), mk("b", "Cable B")],
            &["user: cables".into()],
            800,
        );
        let a = p.find("Cable A").unwrap();
        let b = p.find("Cable B").unwrap();
        assert!(a < b);
        assert!(p.contains("No detailed description"));
        assert!(p.contains("Price: $10"));
    }

    #[test]
    fn empty_product_set_is_stated() {
        let p = build_answer_prompt("¿cuál es mejor?", Intent::Details, &[], &[], 800);
        assert!(p.contains("no products available"));
        assert!(p.contains("Answer only about"));
    }

    #[test]
    fn long_descriptions_are_cut_in_answer_prompt() {
        let product = RankedResult::unranked(Candidate {
            id: "lamp".into(),
            score: 0.7,
            metadata: ProductMetadata {
                title: "Lamp".into(),
                descriptive_text: "x".repeat(5000),
                ..Default::default()
            },
        });
        let p = build_answer_prompt("lámparas", Intent::Search, &[product], &[], 800);
        assert_eq!(p.matches('x').count(), 800);
    }
}
