//! Contract with the presentation layer for module cells.
//!
//! A module is opaque to the grid: it is identified by its component type
//! name and attribute bag. Two cells with the same key can share one live
//! instance.

use gridkit_parser::{Attributes, GridDocument, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleKey {
    pub component: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ModuleKey {
    pub fn new(component: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            component: component.into(),
            attributes,
        }
    }

    /// Key of a module cell; `None` for every other node. Layout-only
    /// attributes (`size`) are not part of a module's identity.
    pub fn of(node: &Node) -> Option<Self> {
        let component = node.component()?;
        let mut attributes = node.attributes.clone();
        attributes.remove(gridkit_parser::ast::SIZE_ATTRIBUTE);
        Some(Self::new(component, attributes))
    }
}

/// Renders module instances for the presentation layer
pub trait ModuleRenderer {
    type Output;

    fn render(&mut self, key: &ModuleKey) -> Self::Output;
}

/// Render every distinct module of a document once
pub fn render_modules<R: ModuleRenderer>(
    renderer: &mut R,
    doc: &GridDocument,
) -> HashMap<ModuleKey, R::Output> {
    let mut rendered = HashMap::new();
    for key in doc.module_cells().filter_map(ModuleKey::of) {
        if !rendered.contains_key(&key) {
            let output = renderer.render(&key);
            rendered.insert(key, output);
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkit_parser::parse;

    struct Counting {
        calls: usize,
    }

    impl ModuleRenderer for Counting {
        type Output = String;

        fn render(&mut self, key: &ModuleKey) -> String {
            self.calls += 1;
            format!("<{}>", key.component)
        }
    }

    #[test]
    fn test_equal_keys_render_once() {
        let doc = parse(
            r#"<mainGrid name="G"><content><row>
                 <cell component="Clock" tz="UTC"/>
                 <cell component="Clock" tz="UTC" size="2"/>
                 <cell component="Clock" tz="CET"/>
               </row></content></mainGrid>"#,
        )
        .unwrap();
        let mut renderer = Counting { calls: 0 };
        let rendered = render_modules(&mut renderer, &doc);
        assert_eq!(renderer.calls, 2);
        assert_eq!(rendered.len(), 2);
        assert!(rendered.values().all(|out| out == "<Clock>"));
    }

    #[test]
    fn test_only_module_cells_have_keys() {
        assert!(ModuleKey::of(&Node::row()).is_none());
        let key = ModuleKey::of(&Node::module_cell("Chart", Attributes::new())).unwrap();
        assert_eq!(key, ModuleKey::new("Chart", Attributes::new()));
    }
}
