use runtime::PopupView;
use wasm_bindgen::JsCast;

use crate::error::{ViewerError, dom_error};

pub const POPUP_CLASS: &str = "glowmap-popup";

pub fn popup_layer_id(container: &str) -> String {
    format!("{container}-popups")
}

/// Absolutely positioned boxes, tip at the popup anchor.
pub fn popup_markup(popups: &[PopupView]) -> String {
    let mut html = String::new();
    for popup in popups {
        html.push_str(&format!(
            r#"<div class="{POPUP_CLASS}" data-marker="{}" style="position:absolute;left:{:.1}px;top:{:.1}px;transform:translate(-50%,-100%);pointer-events:auto">{}</div>"#,
            popup.marker.0, popup.anchor.x, popup.anchor.y, popup.html
        ));
    }
    html
}

/// DOM sibling of the map canvas that holds the open popups.
pub struct PopupLayer {
    element: web_sys::Element,
}

impl PopupLayer {
    pub fn attach(container: &str) -> Result<Self, ViewerError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ViewerError::Dom("no document".to_string()))?;
        let id = popup_layer_id(container);
        if let Some(element) = document.get_element_by_id(&id) {
            return Ok(Self { element });
        }

        let canvas = document
            .get_element_by_id(container)
            .ok_or_else(|| ViewerError::Dom(format!("missing container #{container}")))?
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .map_err(|_| ViewerError::Dom(format!("#{container} is not a canvas")))?;
        let parent = canvas
            .parent_node()
            .ok_or_else(|| ViewerError::Dom(format!("#{container} is detached")))?;

        let element = document
            .create_element("div")
            .map_err(|e| dom_error("create popup layer", e))?;
        element.set_id(&id);
        element
            .set_attribute(
                "style",
                "position:absolute;left:0;top:0;width:0;height:0;overflow:visible",
            )
            .map_err(|e| dom_error("style popup layer", e))?;
        parent
            .append_child(&element)
            .map_err(|e| dom_error("insert popup layer", e))?;
        Ok(Self { element })
    }

    pub fn sync(&self, popups: &[PopupView]) {
        self.element.set_inner_html(&popup_markup(popups));
    }

    pub fn clear(&self) {
        self.element.set_inner_html("");
    }
}
