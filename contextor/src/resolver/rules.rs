//! Deterministic lexicon-based resolution (Spanish and English).
//!
//! Tokens fall in three classes: filler words, attributes (color, price
//! tier, size, brand, technical spec) and product nouns (everything else).
//!
//! Rewriting:
//! - questions, detail requests and inputs without attributes are left as
//!   they are;
//! - input with its own noun is a topic switch: only its content words remain;
//! - attribute-only input is merged onto the newest user turn in the window
//!   that names a product, together with the attributes given since then.
//!   A newer attribute replaces an older one of the same category.
//!
//! Intent: DETAILS iff a detail cue is present and no search cue is.

use futures::future::BoxFuture;

use super::ResolutionStrategy;
use crate::{
    conversation::{Role, Turn},
    error::ContextError,
    query::Intent,
};

const FILLER: &[&str] = &[
    // es
    "busco", "buscar", "busca", "buscame", "muestra", "muestrame", "ensename", "quiero",
    "quisiera", "necesito", "dame", "ver", "ahora", "que", "sea", "sean", "de", "del", "la",
    "el", "los", "las", "lo", "un", "una", "unos", "unas", "en", "con", "para", "por", "y", "o",
    "mas", "menos", "algo", "alguno", "alguna", "algunos", "algunas", "otro", "otra", "otros",
    "otras", "me", "mi", "mis", "tiene", "tenga", "tengan", "color", "marca", "talla", "tamano",
    "precio", "opcion", "opciones", "tambien", "pero", "porfa", "favor", "hay", "muy", "solo",
    "si", "no", "esos", "esas", "estos", "estas", "ese", "esa", "este", "esta", "prefiero",
    "mejor", "gracias", "hola", "ok", "vale", "bueno",
    // en
    "i", "want", "need", "show", "me", "find", "search", "look", "looking", "for", "some", "a",
    "an", "the", "in", "with", "of", "and", "or", "now", "please", "it", "be", "should", "that",
    "them", "one", "ones", "more", "less", "other", "others", "another", "options", "brand",
    "size", "price", "also", "but", "make", "only", "any", "those", "these", "thanks", "hi",
    "instead", "prefer", "by", "made",
];

const COLORS: &[&str] = &[
    "rojo", "roja", "rojos", "rojas", "azul", "azules", "negro", "negra", "negros", "negras",
    "blanco", "blanca", "blancos", "blancas", "verde", "verdes", "amarillo", "amarilla",
    "amarillos", "amarillas", "rosa", "rosas", "rosado", "rosada", "gris", "grises", "morado",
    "morada", "morados", "moradas", "naranja", "naranjas", "dorado", "dorada", "plateado",
    "plateada", "cafe", "marron", "beige", "red", "blue", "black", "white", "green", "yellow",
    "pink", "gray", "grey", "purple", "orange", "gold", "silver", "brown",
];

const PRICE_PREFIXES: &[&str] = &["barat", "econom", "car", "cheap", "expensive", "afford", "premium", "lujo"];

const SIZES: &[&str] = &[
    "grande", "grandes", "pequeno", "pequena", "pequenos", "pequenas", "mediano", "mediana",
    "chico", "chica", "chicos", "chicas", "largo", "larga", "corto", "corta", "small", "large",
    "big", "medium", "mini", "compacto", "compacta", "compact", "xs", "xl", "xxl",
];

const BRANDS: &[&str] = &[
    "sony", "samsung", "apple", "hp", "dell", "lenovo", "asus", "acer", "nike", "adidas", "puma",
    "logitech", "xiaomi", "lg", "microsoft", "canon", "nikon", "bose", "jbl", "anker", "huawei",
    "razer", "corsair", "philips", "panasonic", "motorola", "amazon", "kindle", "nintendo",
];

const SPECS: &[&str] = &[
    "ram", "gb", "tb", "ssd", "hdd", "usb", "bluetooth", "wifi", "inalambrico", "inalambrica",
    "inalambricos", "inalambricas", "wireless", "hdmi", "4k", "hd", "led", "oled",
];

const QUESTION_WORDS: &[&str] = &[
    "cual", "cuales", "cuanto", "cuanta", "cuantos", "cuantas", "which", "what", "why", "how",
    "does", "do", "is", "are", "can",
];

const DETAIL_CUES: &[&str] = &[
    "cual", "cuales", "explica", "explicame", "explicas", "recomiendas", "recomendarias",
    "recomienda", "diferencia", "diferencias", "compara", "comparame", "cuanto", "detalles",
    "which", "why", "explain", "recommend", "difference", "compare", "details",
];

const SEARCH_CUES: &[&str] = &[
    "busca", "buscar", "busco", "buscame", "muestra", "muestrame", "ensename", "quiero",
    "necesito", "otro", "otra", "otros", "otras", "show", "find", "search", "other", "others",
    "another",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Category {
    Color,
    Price,
    Size,
    Brand,
    Spec,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Class {
    Filler,
    Attribute(Category),
    Noun,
}

#[derive(Clone, Debug)]
struct Token {
    /// As typed, punctuation stripped.
    surface: String,
    class: Class,
}

#[derive(Debug, Default)]
struct Parsed {
    nouns: Vec<String>,
    attributes: Vec<(Category, String)>,
}

/// Lexicon-driven resolution without model calls.
#[derive(Clone, Debug, Default)]
pub struct RuleStrategy;

impl RuleStrategy {
    pub fn new() -> Self {
        Self
    }

    fn rewrite_sync(&self, current: &str, window: &[Turn]) -> String {
        if is_question(current) || self.classify_sync(current) == Intent::Details {
            return current.to_string();
        }
        let input = parse(current);
        if !input.nouns.is_empty() {
            return join(&input);
        }
        if input.attributes.is_empty() {
            return current.to_string();
        }

        // Newest user turn naming a product, plus attribute-only turns after it.
        // Earlier follow-ups are read in their resolved form.
        let mut since: Vec<Parsed> = Vec::new();
        let mut anchor: Option<Parsed> = None;
        for turn in window.iter().rev().filter(|t| t.role == Role::User) {
            let Some(text) = turn.search_text() else {
                continue;
            };
            let p = parse(text);
            if !p.nouns.is_empty() {
                anchor = Some(p);
                break;
            }
            since.push(p);
        }
        let Some(mut merged) = anchor else {
            return current.to_string();
        };

        for later in since.into_iter().rev().chain(std::iter::once(input)) {
            for (cat, word) in later.attributes {
                merged.attributes.retain(|(c, _)| *c != cat);
                merged.attributes.push((cat, word));
            }
        }
        join(&merged)
    }

    fn classify_sync(&self, query: &str) -> Intent {
        let words: Vec<String> = words(query).iter().map(|w| fold(w)).collect();
        let has = |set: &[&str]| words.iter().any(|w| set.contains(&w.as_str()));
        let por_que = words.windows(2).any(|w| w[0] == "por" && w[1] == "que");
        let price_filter = words
            .iter()
            .any(|w| w.starts_with("barat") || w.starts_with("cheap") || w.starts_with("econom"));

        let detail = has(DETAIL_CUES) || por_que;
        let search = has(SEARCH_CUES) || price_filter;
        if detail && !search {
            Intent::Details
        } else {
            Intent::Search
        }
    }
}

impl ResolutionStrategy for RuleStrategy {
    fn rewrite<'a>(
        &'a self,
        current: &'a str,
        window: &'a [Turn],
    ) -> BoxFuture<'a, Result<String, ContextError>> {
        let out = self.rewrite_sync(current, window);
        Box::pin(async move { Ok(out) })
    }

    fn classify<'a>(
        &'a self,
        query: &'a str,
        _window: &'a [Turn],
    ) -> BoxFuture<'a, Result<Intent, ContextError>> {
        let out = self.classify_sync(query);
        Box::pin(async move { Ok(out) })
    }
}

fn is_question(text: &str) -> bool {
    if text.contains('?') || text.contains('¿') {
        return true;
    }
    let first = words(text).first().map(|w| w.to_lowercase());
    match first {
        // Only the accented forms are interrogative in Spanish ("que sea HP" is not).
        Some(w) if w == "qué" || w == "cuál" || w == "cuáles" || w == "cómo" => true,
        Some(w) => QUESTION_WORDS.contains(&fold(&w).as_str()),
        None => false,
    }
}

fn parse(text: &str) -> Parsed {
    let mut out = Parsed::default();
    for t in tokenize(text) {
        match t.class {
            Class::Noun => out.nouns.push(t.surface),
            Class::Attribute(c) => out.attributes.push((c, t.surface)),
            Class::Filler => {}
        }
    }
    out
}

fn join(p: &Parsed) -> String {
    p.nouns
        .iter()
        .chain(p.attributes.iter().map(|(_, w)| w))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokenize(text: &str) -> Vec<Token> {
    words(text)
        .into_iter()
        .map(|surface| {
            let class = classify_word(&surface);
            Token { surface, class }
        })
        .collect()
}

fn classify_word(surface: &str) -> Class {
    let key = fold(surface);
    if FILLER.contains(&key.as_str()) {
        return Class::Filler;
    }
    if COLORS.contains(&key.as_str()) {
        return Class::Attribute(Category::Color);
    }
    if PRICE_PREFIXES.iter().any(|p| key.starts_with(p)) && !is_plain_noun_with_car(&key) {
        return Class::Attribute(Category::Price);
    }
    if SIZES.contains(&key.as_str()) {
        return Class::Attribute(Category::Size);
    }
    if SPECS.contains(&key.as_str()) || key.chars().any(|c| c.is_ascii_digit()) {
        return Class::Attribute(Category::Spec);
    }
    if BRANDS.contains(&key.as_str()) || is_acronym(surface) {
        return Class::Attribute(Category::Brand);
    }
    if key.chars().count() < 2 {
        return Class::Filler;
    }
    Class::Noun
}

/// `car` as a prefix is only a price cue for caro/cara/caros/caras.
fn is_plain_noun_with_car(key: &str) -> bool {
    key.starts_with("car") && !matches!(key, "caro" | "cara" | "caros" | "caras")
}

/// All-caps word of 2+ letters, e.g. `HP`, `LG`.
fn is_acronym(surface: &str) -> bool {
    surface.chars().count() >= 2
        && surface.chars().all(|c| c.is_alphabetic() && c.is_uppercase())
}

/// Splits on anything that is not a letter or digit.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase, drop Spanish accents and fold ñ to n for lexicon lookups.
fn fold(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
