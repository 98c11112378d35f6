//! Result set ⇄ XML document mapping.
//!
//! The document shape is fixed:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <ResearchResults>
//!   <CategoryName>
//!     <Item><fieldA>...</fieldA><fieldB>...</fieldB></Item>
//!   </CategoryName>
//!   <ScalarCategory>text</ScalarCategory>
//! </ResearchResults>
//! ```
//!
//! [`encode`] writes any [`ResultSet`](autoresearch_shared::ResultSet).
//! [`decode`] only reads back sequence-shaped categories: a scalar category
//! decodes to an empty sequence and all values come back as text.

mod decoder;
mod encoder;
mod names;

pub use decoder::{decode, decode_str};
pub use encoder::{encode, encode_to_string};
pub use names::{first_illegal_char, is_valid_tag, strip_illegal_chars};

#[cfg(test)]
mod tests {
    use super::*;
    use autoresearch_shared::{
        CategoryValue, DecodedResults, Entry, FieldMap, Fields, ResearchError, ResultSet, Scalar,
    };
    use indexmap::indexmap;

    #[test]
    fn misconduct_scenario_roundtrip() {
        let set = ResultSet::from_json_str(
            r#"{"misconducts": [{"title": "Issue 1", "description": "Description of issue 1"}]}"#,
        )
        .expect("parse scenario");

        let xml = encode(&set).expect("encode");
        let text = String::from_utf8(xml.clone()).expect("utf-8");
        assert!(text.contains("<ResearchResults>"));
        assert_eq!(text.matches("<misconducts>").count(), 1);
        assert_eq!(text.matches("<Item>").count(), 1);

        let decoded = decode(&xml).expect("decode");
        let expected: DecodedResults = indexmap! {
            "misconducts".to_string() => vec![indexmap! {
                "title".to_string() => Some("Issue 1".to_string()),
                "description".to_string() => Some("Description of issue 1".to_string()),
            }],
        };
        assert_eq!(decoded, expected);
    }

    #[test]
    fn string_field_maps_roundtrip_exactly() {
        let mut set = ResultSet::new();
        let mut expected = DecodedResults::new();

        for (c, category) in ["zulu", "alpha", "mike_3", "x.y-z"].into_iter().enumerate() {
            let mut items = Vec::new();
            for i in 0..=c {
                let mut fields = Fields::new();
                let mut decoded = FieldMap::new();
                for name in ["second", "first", "Third"] {
                    let text = format!(" {name} #{i} of {category} & <more> ");
                    fields.insert(name.to_string(), Scalar::from(text.as_str()));
                    decoded.insert(name.to_string(), Some(text));
                }
                set.push_fields(category, fields);
                items.push(decoded);
            }
            expected.insert(category.to_string(), items);
        }

        let decoded = decode(&encode(&set).expect("encode")).expect("decode");
        assert_eq!(decoded, expected);

        // Order, not just membership.
        assert!(decoded.keys().eq(expected.keys()));
        for (category, items) in &decoded {
            for (got, want) in items.iter().zip(&expected[category]) {
                assert!(got.keys().eq(want.keys()));
            }
        }
    }

    #[test]
    fn scalar_category_roundtrips_to_empty_sequence() {
        let mut set = ResultSet::new();
        set.insert_scalar("summary", "One-line answer");
        set.push_fields(
            "sources",
            Fields::from([("url".to_string(), Scalar::from("https://example.com"))]),
        );

        let decoded = decode(&encode(&set).expect("encode")).expect("decode");
        assert_eq!(decoded["summary"], Vec::<FieldMap>::new());
        assert_eq!(decoded["sources"].len(), 1);
    }

    #[test]
    fn typed_scalars_come_back_as_text() {
        let mut set = ResultSet::new();
        set.push_fields(
            "metrics",
            Fields::from([
                ("count".to_string(), Scalar::from(7_i64)),
                ("ratio".to_string(), Scalar::from(0.25)),
                ("ok".to_string(), Scalar::from(true)),
                ("missing".to_string(), Scalar::Absent),
            ]),
        );

        let decoded = decode(&encode(&set).expect("encode")).expect("decode");
        let item = &decoded["metrics"][0];
        assert_eq!(item["count"].as_deref(), Some("7"));
        assert_eq!(item["ratio"].as_deref(), Some("0.25"));
        assert_eq!(item["ok"].as_deref(), Some("true"));
        assert_eq!(item["missing"], None);
    }

    #[test]
    fn category_and_item_counts_are_preserved() {
        let mut set = ResultSet::new();
        let counts = [3_usize, 0, 5, 1];
        for (n, &m) in counts.iter().enumerate() {
            let category = format!("category_{n}");
            if m == 0 {
                set.insert(category, CategoryValue::Entries(Vec::new()));
                continue;
            }
            for i in 0..m {
                set.push_entry(
                    category.as_str(),
                    Entry::Fields(Fields::from([("index".to_string(), Scalar::from(i as u64))])),
                );
            }
        }

        let decoded = decode(&encode(&set).expect("encode")).expect("decode");
        assert_eq!(decoded.len(), counts.len());
        for (n, (category, items)) in decoded.iter().enumerate() {
            assert_eq!(category, &format!("category_{n}"));
            assert_eq!(items.len(), counts[n]);
            for (i, item) in items.iter().enumerate() {
                assert_eq!(item["index"].as_deref(), Some(i.to_string().as_str()));
            }
        }
    }

    #[test]
    fn illegal_names_fail_before_any_output() {
        let mut set = ResultSet::new();
        set.insert_scalar("fine", "x");
        set.insert_scalar("has space", "y");
        assert!(matches!(encode(&set), Err(ResearchError::Serialization { .. })));
        assert!(!is_valid_tag("9lives"));
    }

    #[test]
    fn fixture_json_encodes_to_fixture_shape() {
        let json = std::fs::read_to_string("../../../fixtures/json/research-results.json")
            .expect("read json fixture");
        let xml = std::fs::read("../../../fixtures/xml/research-results.xml")
            .expect("read xml fixture");

        let set = ResultSet::from_json_str(&json).expect("parse json fixture");
        let encoded = decode(&encode(&set).expect("encode")).expect("decode encoded");
        let from_fixture = decode(&xml).expect("decode xml fixture");
        assert_eq!(encoded, from_fixture);
    }
}
