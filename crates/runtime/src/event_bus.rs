use crate::frame::Frame;
use crate::layer::LayerReport;
use crate::marker::MarkerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEventKind {
    Load,
    SourceAdded { id: String },
    LayerAdded { id: String, report: LayerReport },
    LayerRemoved { id: String },
    PopupOpened { marker: MarkerId },
    PopupClosed { marker: MarkerId },
}

/// Something the map did, tagged with the last completed repaint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEvent {
    pub frame_index: u64,
    pub kind: MapEventKind,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<MapEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, frame: Frame, kind: MapEventKind) {
        tracing::trace!(frame = frame.index, ?kind, "map event");
        self.events.push(MapEvent {
            frame_index: frame.index,
            kind,
        });
    }

    pub fn events(&self) -> &[MapEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }
}
