use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{AppError, Result};
use crate::models::FeedItem;

const ITEM_PATH: [&str; 3] = ["rss", "channel", "item"];

/// Parse an RSS 2.0 document into feed items, preserving document order.
///
/// Every item must carry `title`, `link` and a `source` element with both
/// text and a `url` attribute, otherwise the whole document is rejected.
pub fn parse_rss(xml: &[u8]) -> Result<Vec<FeedItem>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut current_item: Option<ItemBuilder> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if path.is_empty() {
                    check_root(&name, &mut saw_root)?;
                }
                path.push(name);

                if is_item(&path) {
                    current_item = Some(ItemBuilder::default());
                } else if is_item_field(&path, "source") {
                    if let Some(ref mut item) = current_item {
                        item.source_url = source_url(&e);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if path.is_empty() {
                    check_root(&name, &mut saw_root)?;
                }
                // Self-closing <source url="..."/> still contributes its url
                if name == "source" && is_item(&path) {
                    if let Some(ref mut item) = current_item {
                        item.source_url = source_url(&e);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if is_item(&path) {
                    if let Some(builder) = current_item.take() {
                        items.push(builder.build(items.len())?);
                    }
                }
                path.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| AppError::Parse(format!("XML parse error: {}", e)))?;
                append_text(&path, current_item.as_mut(), &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                append_text(&path, current_item.as_mut(), &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(AppError::Parse("document has no <rss> root element".to_string()));
    }
    if !path.is_empty() {
        return Err(AppError::Parse(format!("unexpected end of document inside <{}>", path.join("/"))));
    }

    Ok(items)
}

fn check_root(name: &str, saw_root: &mut bool) -> Result<()> {
    if name != "rss" {
        return Err(AppError::Parse(format!("expected <rss> root element, found <{}>", name)));
    }
    *saw_root = true;
    Ok(())
}

fn is_item(path: &[String]) -> bool {
    path.len() == ITEM_PATH.len() && path.iter().zip(ITEM_PATH).all(|(a, b)| a == b)
}

fn is_item_field(path: &[String], field: &str) -> bool {
    path.len() == ITEM_PATH.len() + 1 && is_item(&path[..ITEM_PATH.len()]) && path[ITEM_PATH.len()] == field
}

fn source_url(e: &quick_xml::events::BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"url")
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.trim().to_string())
}

fn append_text(path: &[String], item: Option<&mut ItemBuilder>, text: &str) {
    let Some(item) = item else {
        return;
    };
    if path.len() != ITEM_PATH.len() + 1 || !is_item(&path[..ITEM_PATH.len()]) {
        return;
    }
    let slot = match path[ITEM_PATH.len()].as_str() {
        "title" => &mut item.title,
        "link" => &mut item.link,
        "source" => &mut item.source_name,
        _ => return,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    link: Option<String>,
    source_name: Option<String>,
    source_url: Option<String>,
}

impl ItemBuilder {
    fn build(self, index: usize) -> Result<FeedItem> {
        Ok(FeedItem {
            title: required(self.title, index, "<title>")?,
            tracking_link: required(self.link, index, "<link>")?,
            source_name: required(self.source_name, index, "<source> text")?,
            source_url: required(self.source_url, index, "<source url>")?,
        })
    }
}

fn required(value: Option<String>, index: usize, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Parse(format!("feed item {} is missing {}", index, field)))
}
