//! Layout of a decoded info card.

use std::fmt::Write as _;

use crate::records::Record;

/// Title shown when no record looks like a title.
pub const FALLBACK_TITLE: &str = "Info card";

/// Values up to this many characters may share a row.
pub const PAIR_MAX_CHARS: usize = 18;

const TITLE_KEYS: &[&str] = &["title", "name", "ism", "nomi", "sarlavha", "fio", "ism familiya", "full name"];

const PHONE_KEYS: &[&str] = &["phone", "tel", "telefon", "mobile", "raqam", "telefon raqami", "phone number"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Value as entered.
    pub display: String,
    /// `tel:` link with separators removed.
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Single(Record),
    Pair(Record, Record),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub title: String,
    pub contact: Option<Contact>,
    pub rows: Vec<Row>,
}

fn key_matches(key: &str, aliases: &[&str]) -> bool {
    let key = key.trim().to_lowercase();
    aliases.contains(&key.as_str())
}

fn tel_href(value: &str) -> String {
    let digits: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect();
    format!("tel:{digits}")
}

fn is_short(record: &Record) -> bool {
    record.value.chars().count() <= PAIR_MAX_CHARS
}

/// Builds the card layout. The title record, if any, is taken out of the
/// body; the phone record stays in the body and is also exposed as a contact
/// link.
pub fn render_card(records: &[Record]) -> CardView {
    let title_index = records
        .iter()
        .position(|r| key_matches(&r.key, TITLE_KEYS) && !r.value.trim().is_empty());
    let title = title_index
        .map(|i| records[i].value.trim().to_string())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());

    let contact = records
        .iter()
        .find(|r| key_matches(&r.key, PHONE_KEYS) && !r.value.trim().is_empty())
        .map(|r| Contact {
            display: r.value.trim().to_string(),
            href: tel_href(&r.value),
        });

    let body: Vec<&Record> = records
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != title_index)
        .map(|(_, r)| r)
        .collect();

    let mut rows = Vec::new();
    let mut i = 0;
    while i < body.len() {
        match body.get(i + 1) {
            Some(next) if is_short(body[i]) && is_short(next) => {
                rows.push(Row::Pair(body[i].clone(), (*next).clone()));
                i += 2;
            }
            _ => {
                rows.push(Row::Single(body[i].clone()));
                i += 1;
            }
        }
    }

    CardView { title, contact, rows }
}

impl CardView {
    /// Plain-text rendering for terminals.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", "=".repeat(self.title.chars().count().max(4)));
        for row in &self.rows {
            match row {
                Row::Single(r) => {
                    let _ = writeln!(out, "{}: {}", r.key, r.value);
                }
                Row::Pair(a, b) => {
                    let left = format!("{}: {}", a.key, a.value);
                    let pad = 32usize.saturating_sub(left.chars().count());
                    let _ = writeln!(out, "{left}{}{}: {}", " ".repeat(pad.max(2)), b.key, b.value);
                }
            }
        }
        if let Some(contact) = &self.contact {
            let _ = writeln!(out, "\nCall: {} <{}>", contact.display, contact.href);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_card() {
        let records = vec![Record::new("Ism", "Ali"), Record::new("Telefon", "+998901234567")];
        let card = render_card(&records);
        assert_eq!(card.title, "Ali");
        assert_eq!(
            card.contact,
            Some(Contact {
                display: "+998901234567".into(),
                href: "tel:+998901234567".into()
            })
        );
        assert_eq!(card.rows, vec![Row::Single(Record::new("Telefon", "+998901234567"))]);
    }

    #[test]
    fn fallback_title_and_no_contact() {
        let card = render_card(&[Record::new("Color", "red")]);
        assert_eq!(card.title, FALLBACK_TITLE);
        assert_eq!(card.contact, None);
    }

    #[test]
    fn aliases_are_case_insensitive() {
        let card = render_card(&[Record::new(" NAME ", "Vali"), Record::new("PHONE", "+1 (555) 010-99")]);
        assert_eq!(card.title, "Vali");
        assert_eq!(card.contact.unwrap().href, "tel:+155501099");
    }

    #[test]
    fn short_neighbours_pair_up() {
        let long = "a value that is clearly too long";
        let records = vec![
            Record::new("A", "1"),
            Record::new("B", "2"),
            Record::new("C", long),
            Record::new("D", "4"),
            Record::new("E", "5"),
            Record::new("F", "6"),
        ];
        let rows = render_card(&records).rows;
        assert_eq!(
            rows,
            vec![
                Row::Pair(records[0].clone(), records[1].clone()),
                Row::Single(records[2].clone()),
                Row::Pair(records[3].clone(), records[4].clone()),
                Row::Single(records[5].clone()),
            ]
        );
    }

    #[test]
    fn eighteen_chars_still_pair() {
        let v18 = "x".repeat(18);
        let v19 = "x".repeat(19);
        let rows = render_card(&[Record::new("a", v18.clone()), Record::new("b", v18)]).rows;
        assert!(matches!(rows[..], [Row::Pair(_, _)]));
        let rows = render_card(&[Record::new("a", v19), Record::new("b", "y")]).rows;
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn empty_card() {
        let card = render_card(&[]);
        assert_eq!(card.title, FALLBACK_TITLE);
        assert!(card.rows.is_empty());
        assert!(card.to_text().starts_with(FALLBACK_TITLE));
    }

    #[test]
    fn text_rendering_mentions_contact() {
        let card = render_card(&[Record::new("Ism", "Ali"), Record::new("Telefon", "+998901234567")]);
        let text = card.to_text();
        assert!(text.starts_with("Ali\n"));
        assert!(text.contains("tel:+998901234567"));
    }
}
