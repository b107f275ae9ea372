use std::sync::Arc;

use cardcode::card::{render_card, Row};
use cardcode::config::Config;
use cardcode::generator::{Code128Generator, QrGenerator};
use cardcode::orchestrator::{Controller, InputSnapshot, Phase, SizeInput};
use cardcode::projector::{filter_non_empty, flatten, MAX_INPUT_CHARS};
use cardcode::records::{Field, RecordModel};
use cardcode::resolver::{LabelOptions, Mode};
use cardcode::token;

fn controller() -> Controller {
    Controller::new(Config::default(), Arc::new(QrGenerator), Arc::new(Code128Generator::new()))
}

#[tokio::test]
async fn edited_records_travel_through_a_card_url() {
    let mut model = RecordModel::new();
    model.update_record(0, Field::Key, "Ism");
    model.update_record(0, Field::Value, "Ali");
    model.add_record();
    model.update_record(1, Field::Key, "Telefon");
    model.update_record(1, Field::Value, "+998 90 123-45-67");
    model.add_record(); // left blank

    assert_eq!(
        flatten(model.records(), MAX_INPUT_CHARS),
        "Ism: Ali\nTelefon: +998 90 123-45-67"
    );
    assert_eq!(filter_non_empty(model.records()).len(), 2);

    let mut c = controller();
    let view = c
        .update(InputSnapshot {
            records: model.records().to_vec(),
            card_mode: true,
            size: SizeInput::parse("400"),
            ..InputSnapshot::default()
        })
        .await;
    assert_eq!(view.phase, Phase::Fulfilled);
    assert_eq!(view.size, 400);
    let code = view.image.unwrap();
    assert_eq!(code.image.dimensions(), (400, 400));
    assert!(code.payload.starts_with("https://cardcode.app/?card="));

    let records = token::decode_url(&code.payload, "card").unwrap();
    let card = render_card(&records);
    assert_eq!(card.title, "Ali");
    assert_eq!(card.contact.unwrap().href, "tel:+998901234567");
    assert!(matches!(card.rows.as_slice(), [Row::Single(r)] if r.key == "Telefon"));
}

#[test]
fn reserved_characters_survive_the_token() {
    let records = vec![
        cardcode::records::Record::new("a&b=c", "1+1 / 50%"),
        cardcode::records::Record::new("Manzil", "Toshkent,\nChilonzor 7"),
        cardcode::records::Record::new("Ўзбек", "тил 🙂"),
    ];
    let t = token::encode(&records);
    assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    let url = token::card_url("https://example.org/view?lang=uz#top", "card", &t);
    assert_eq!(token::decode_url(&url, "card"), Some(records));
}

#[test]
fn foreign_urls_show_no_card() {
    assert_eq!(token::decode_url("https://example.org/?q=1", "card"), None);
    assert_eq!(token::decode_url("https://example.org/?card=%%%", "card"), None);
}

#[tokio::test]
async fn barcode_with_custom_label() {
    let mut c = controller();
    let view = c
        .update(InputSnapshot {
            records: vec![cardcode::records::Record::new("", "VIP-01-2025")],
            mode: Mode::Linear,
            label: LabelOptions::new(true, Some("VIP-01")),
            ..InputSnapshot::default()
        })
        .await;
    assert_eq!(view.phase, Phase::Fulfilled);
    let code = view.image.unwrap();
    assert_eq!(code.mode, Mode::Linear);
    assert_eq!(code.label.as_deref(), Some("VIP-01"));
    assert_eq!(code.payload, "VIP-01-2025");
}

#[tokio::test]
async fn clearing_everything_goes_idle() {
    let mut c = controller();
    c.update(InputSnapshot {
        records: vec![cardcode::records::Record::new("k", "v")],
        ..InputSnapshot::default()
    })
    .await;
    let view = c.update(InputSnapshot::default()).await;
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.image.is_none());
    assert!(view.error.is_none());
}

#[test]
fn blank_pairs_in_a_token_never_reach_the_card() {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let t = URL_SAFE_NO_PAD.encode(r#"[["",""],["Ism","Ali"],["",""],["Yosh","30"]]"#);
    let records = token::decode(&t).unwrap();
    let card = render_card(&records);
    assert_eq!(card.title, "Ali");
    assert_eq!(card.rows.len(), 1);
    assert!(matches!(&card.rows[0], Row::Single(r) if r.key == "Yosh"));
}

#[tokio::test]
async fn clearing_the_model_goes_idle() {
    let mut model = RecordModel::new();
    model.update_record(0, Field::Value, "hello");
    let mut c = controller();
    let snap = |model: &RecordModel| InputSnapshot {
        records: model.records().to_vec(),
        ..InputSnapshot::default()
    };
    assert_eq!(c.update(snap(&model)).await.phase, Phase::Fulfilled);

    model.clear();
    assert_eq!(model.len(), 1);
    let view = c.update(snap(&model)).await;
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.image.is_none());
}

#[test]
fn share_links_use_the_flattened_text() {
    use cardcode::share::{share_url, ShareTarget};

    let records = vec![
        cardcode::records::Record::new("Ism", "Ali"),
        cardcode::records::Record::new("Telefon", "+998901234567"),
    ];
    let text = flatten(&records, MAX_INPUT_CHARS);
    assert_eq!(
        share_url(ShareTarget::WhatsApp, &text),
        "https://wa.me/?text=Ism%3A%20Ali%0ATelefon%3A%20%2B998901234567"
    );
}
