use std::collections::BTreeMap;

use foundation::math::{LngLat, Vec2};

use crate::transform::Transform;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u32);

/// DOM element standing in for a marker: size, shape and opacity.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerElement {
    pub width_px: f64,
    pub height_px: f64,
    pub round: bool,
    pub opacity: f32,
}

impl MarkerElement {
    /// Fully transparent circle that still receives pointer events.
    pub fn invisible_circle(diameter_px: f64) -> Self {
        Self {
            width_px: diameter_px,
            height_px: diameter_px,
            round: true,
            opacity: 0.0,
        }
    }

    fn contains(&self, center: Vec2, point: Vec2) -> bool {
        let d = point - center;
        let (rx, ry) = (self.width_px / 2.0, self.height_px / 2.0);
        if rx <= 0.0 || ry <= 0.0 {
            return false;
        }
        if self.round {
            (d.x / rx).powi(2) + (d.y / ry).powi(2) <= 1.0
        } else {
            d.x.abs() <= rx && d.y.abs() <= ry
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub html: String,
    /// Distance in pixels between the anchor point and the popup tip.
    pub offset_px: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub lng_lat: LngLat,
    pub element: MarkerElement,
    /// Pixel offset of the element center from the projected point.
    pub offset: Vec2,
    pub popup: Option<Popup>,
    pub popup_open: bool,
}

impl Marker {
    pub fn new(lng_lat: LngLat, element: MarkerElement) -> Self {
        Self {
            lng_lat,
            element,
            offset: Vec2::ZERO,
            popup: None,
            popup_open: false,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_popup(mut self, popup: Popup) -> Self {
        self.popup = Some(popup);
        self
    }

    /// Element center on screen.
    pub fn screen_center(&self, transform: &Transform) -> Option<Vec2> {
        transform
            .project_lng_lat(self.lng_lat)
            .map(|p| p + self.offset)
    }
}

/// An open popup ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub marker: MarkerId,
    pub html: String,
    /// Screen position of the popup tip.
    pub anchor: Vec2,
}

#[derive(Debug, Default)]
pub struct MarkerSet {
    next_id: u32,
    markers: BTreeMap<MarkerId, Marker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, marker: Marker) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        self.markers.insert(id, marker);
        id
    }

    pub fn remove(&mut self, id: MarkerId) -> Option<Marker> {
        self.markers.remove(&id)
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.markers.iter().map(|(id, m)| (*id, m))
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Topmost marker under `point`; later markers sit above earlier ones.
    pub fn hit_test(&self, transform: &Transform, point: Vec2) -> Option<MarkerId> {
        self.markers
            .iter()
            .rev()
            .find(|(_, m)| {
                m.screen_center(transform)
                    .is_some_and(|center| m.element.contains(center, point))
            })
            .map(|(id, _)| *id)
    }

    /// Flips the popup of `id`. Returns the new open state, `None` when the
    /// marker is unknown or has no popup.
    pub fn toggle_popup(&mut self, id: MarkerId) -> Option<bool> {
        let marker = self.markers.get_mut(&id)?;
        marker.popup.as_ref()?;
        marker.popup_open = !marker.popup_open;
        Some(marker.popup_open)
    }

    /// Closes every open popup and returns the affected markers.
    pub fn close_popups(&mut self) -> Vec<MarkerId> {
        let mut closed = Vec::new();
        for (id, marker) in self.markers.iter_mut() {
            if marker.popup_open {
                marker.popup_open = false;
                closed.push(*id);
            }
        }
        closed
    }

    pub fn open_popups(&self, transform: &Transform) -> Vec<PopupView> {
        self.markers
            .iter()
            .filter(|(_, m)| m.popup_open)
            .filter_map(|(id, m)| {
                let popup = m.popup.as_ref()?;
                let point = transform.project_lng_lat(m.lng_lat)?;
                Some(PopupView {
                    marker: *id,
                    html: popup.html.clone(),
                    anchor: Vec2::new(point.x, point.y - popup.offset_px),
                })
            })
            .collect()
    }
}
