//! End-to-end extraction against a stubbed transport

use std::cell::Cell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use scrape_model::{
    processors, Dialect, Extractor, FetchConfig, FetchError, Fetcher, FieldDescriptor,
    MemoryCache, Model, Overrides, Populate, PopulationError, PostParse, ProcessorError, Value,
};

const URL: &str = "http://en.m.wikipedia.org/wiki/Guido_van_Rossum";

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Guido van Rossum</title></head>
<body>
<h1 id="section_0">Guido van Rossum</h1>
<div id="content">
  <div>
    <table>
      <tr><th>Guido van Rossum</th></tr>
      <tr><td><a href="wiki/File:Guido_van_Rossum_OSCON_2006.jpg"><img src="guido.jpg"></a></td></tr>
      <tr><th>Born</th><td>31 January 1956</td></tr>
      <tr><td><a href="/wiki/Netherlands">dutch</a></td></tr>
    </table>
  </div>
  <div>
    <ul>
      <li><a class="external" href="http://www.python.org/~guido/">Guido's personal home page</a></li>
      <li><a class="external" href="http://neopythonic.blogspot.com/">Neopythonic</a></li>
      <li><a href="/wiki/Python">Python</a></li>
    </ul>
  </div>
</div>
</body>
</html>"#;

struct Wikipedia;

impl Model for Wikipedia {
    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::xpath("photo_url", r#"//*[@id="content"]/div[1]/table/tbody/tr[2]/td/a"#)
                .take_first(true),
            FieldDescriptor::css(
                "nationality",
                "#content > div:nth-child(1) > table > tbody > tr:nth-child(4) > td > a::text",
            )
            .auto_extract(true)
            .take_first(true)
            .processor(processors::uppercase()),
            FieldDescriptor::css(
                "links",
                "#content > div:nth-child(2) > ul > li > a.external::attr(href)",
            )
            .auto_extract(true),
        ]
    }

    fn overrides(&self) -> Overrides {
        Overrides::new()
            .on("photo_url", |raw, _| {
                let href = raw
                    .nodes()
                    .first()
                    .map(|node| node.select(Dialect::XPath, "@href"))
                    .transpose()
                    .map_err(|e| ProcessorError::msg(e.to_string()))?
                    .and_then(|hrefs| hrefs.first().map(|n| n.extract()))
                    .ok_or_else(|| ProcessorError::msg("photo has no link"))?;
                Ok(Value::Text(format!("http://en.m.wikipedia.org/{href}")))
            })
            .on("name", |raw, _| {
                Ok(raw.nodes().first().map(|n| n.extract()).into())
            })
    }

    fn post_parse(&self, pass: &mut PostParse<'_>) {
        let url = pass.source().map(String::from).into();
        pass.set("url", url);
    }
}

/// Stand-in for an ORM model
#[derive(Debug, Default)]
struct DummyModel {
    name: Option<String>,
    nationality: Option<String>,
}

impl Populate for DummyModel {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), PopulationError> {
        let text = value.as_str().map(String::from);
        match name {
            "name" => self.name = text,
            "nationality" => self.nationality = text,
            other => {
                return Err(PopulationError::Rejected {
                    field: other.to_string(),
                    reason: "not a DummyModel attribute".to_string(),
                })
            }
        }
        Ok(())
    }
}

fn fetcher(calls: &Rc<Cell<usize>>, cache: &Rc<MemoryCache>) -> Fetcher {
    let seen = Rc::clone(calls);
    Fetcher::new(FetchConfig::default().cached(Some(1800)))
        .with_transport(move |_url: &str| -> Result<Vec<u8>, FetchError> {
            seen.set(seen.get() + 1);
            Ok(PAGE.as_bytes().to_vec())
        })
        .with_cache(Rc::clone(cache))
}

fn extractor(calls: &Rc<Cell<usize>>, cache: &Rc<MemoryCache>) -> Extractor<Wikipedia> {
    let mut extractor = Extractor::new(Wikipedia)
        .unwrap()
        .with_fetcher(fetcher(calls, cache))
        .with_url(URL);
    extractor
        .load_mappings(r##"{"name": {"css": "#section_0::text"}}"##)
        .unwrap();
    extractor
}

#[test]
fn test_fetched_correct_name() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());
    let record = extractor(&calls, &cache).parse().unwrap();

    assert_eq!(record.get("name"), Some(&Value::from("Guido van Rossum")));
    // Raw keeps the unextracted text nodes
    assert_eq!(record.raw().get("name").unwrap().nodes().len(), 1);
}

#[test]
fn test_all_fields() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());
    let record = extractor(&calls, &cache).parse().unwrap();

    assert_eq!(
        record.get("photo_url"),
        Some(&Value::from(
            "http://en.m.wikipedia.org/wiki/File:Guido_van_Rossum_OSCON_2006.jpg"
        ))
    );
    assert_eq!(record.get("nationality"), Some(&Value::from("DUTCH")));
    assert_eq!(
        record.get("links"),
        Some(&Value::from(vec![
            "http://www.python.org/~guido/",
            "http://neopythonic.blogspot.com/",
        ]))
    );
    assert_eq!(record.get("url"), Some(&Value::from(URL)));

    let names: Vec<&str> = record.field_names().collect();
    assert_eq!(names, vec!["photo_url", "nationality", "links", "name"]);
}

#[test]
fn test_cache_hit_makes_no_live_fetch() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());

    let first = extractor(&calls, &cache).parse().unwrap();
    assert_eq!(calls.get(), 1);

    let second = extractor(&calls, &cache).parse().unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(first.to_json(), second.to_json());
}

#[test]
fn test_populate_dummy_model() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());
    let record = extractor(&calls, &cache).parse().unwrap();

    let mut dummy = DummyModel::default();
    record
        .populate(&mut dummy, Some(&["name", "nationality"]))
        .unwrap();
    assert_eq!(dummy.name.as_deref(), Some("Guido van Rossum"));
    assert_eq!(dummy.nationality.as_deref(), Some("DUTCH"));

    let mut all = HashMap::new();
    record.populate(&mut all, None).unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn test_load_mappings_from_json_string() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());
    let mut extractor = extractor(&calls, &cache);

    extractor.load_mappings(r#"{"test": {"css": "div"}}"#).unwrap();
    let field = extractor.mapping().get("test").unwrap();
    assert_eq!(field.dialect(), Dialect::Css);
    assert_eq!(field.expression(), "div");
}

#[test]
fn test_load_mappings_from_json_path() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());
    let mut extractor = extractor(&calls, &cache);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"test": {{"css": "div"}}, "name": "h1::text"}}"#).unwrap();

    extractor.load_mappings_from_path(file.path()).unwrap();
    assert_eq!(extractor.mapping().get("test").unwrap().expression(), "div");
    // Later load wins, position is kept
    assert_eq!(extractor.mapping().get("name").unwrap().expression(), "h1::text");
    assert_eq!(extractor.mapping().names().nth(3), Some("name"));
}

#[test]
fn test_load_mappings_from_reader() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());
    let mut extractor = extractor(&calls, &cache);

    let json = br#"{"test": {"xpath": "//div"}}"#;
    extractor.mapping_mut().load_from_reader(&json[..]).unwrap();
    assert_eq!(
        extractor.mapping().get("test").unwrap().dialect(),
        Dialect::XPath
    );
}

#[test]
fn test_missing_mapping_file() {
    let calls = Rc::new(Cell::new(0));
    let cache = Rc::new(MemoryCache::new());
    let mut extractor = extractor(&calls, &cache);

    let dir = tempfile::tempdir().unwrap();
    let before = extractor.mapping().len();
    assert!(extractor
        .load_mappings_from_path(dir.path().join("mappings.json"))
        .is_err());
    assert_eq!(extractor.mapping().len(), before);
}
