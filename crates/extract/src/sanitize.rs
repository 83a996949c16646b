//! HTML sanitizer: drop `<style>`, unwrap `<div>`/`<span>` keeping their
//! children, delete `<noscript>` with its whole subtree, and strip every
//! attribute outside a fixed allow-list. Mirrors `lxml.html.clean.Cleaner`
//! configured the way `original_source/crawler/utils.py`'s `HTML_CLEANER`
//! is configured.

use kuchiki::NodeRef;

pub const ALLOWED_ATTRS: &[&str] = &[
    "alt", "charset", "content", "href", "id", "lang", "media", "name", "property", "rel", "src", "target", "title",
    "type",
];

pub fn sanitize(document: &NodeRef) {
    remove_subtrees(document, &["style", "noscript"]);
    unwrap_elements(document, &["div", "span"]);
    strip_disallowed_attributes(document);
}

fn remove_subtrees(document: &NodeRef, tags: &[&str]) {
    let selector = tags.join(", ");
    let Ok(matches) = document.select(&selector) else { return };
    let targets: Vec<NodeRef> = matches.map(|m| m.as_node().clone()).collect();
    for node in targets {
        node.detach();
    }
}

fn unwrap_elements(document: &NodeRef, tags: &[&str]) {
    let selector = tags.join(", ");
    let Ok(matches) = document.select(&selector) else { return };
    let targets: Vec<NodeRef> = matches.map(|m| m.as_node().clone()).collect();
    for node in targets {
        let children: Vec<NodeRef> = node.children().collect();
        for child in children {
            child.detach();
            node.insert_before(child);
        }
        node.detach();
    }
}

fn strip_disallowed_attributes(document: &NodeRef) {
    for node in document.inclusive_descendants() {
        let Some(element) = node.as_element() else { continue };
        let mut attrs = element.attributes.borrow_mut();
        let to_remove: Vec<_> = attrs
            .map
            .keys()
            .filter(|name| !ALLOWED_ATTRS.contains(&name.local.as_ref()))
            .cloned()
            .collect();
        for name in to_remove {
            attrs.map.remove(&name);
        }
    }
}
