//! # Tools
//!
//! The physical implement the user holds - pen, its eraser end, an airbrush,
//! a puck mouse. A tool is identified by its type together with the hardware
//! serial it announces over `MSC_SERIAL`, and that identity is stable across
//! proximity cycles: leave the sensing range, come back, and the registry
//! resolves you to the same [`ToolId`]. Consumers use this to re-associate a
//! returning pen with its brush settings, undo grouping, and so on.

use crate::codes;

/// Type of a tool, as announced by its `BTN_TOOL_*` code.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::EnumCount,
    strum::EnumIter,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
pub enum ToolType {
    Pen,
    /// The nib on the reverse of some styli, primarily intended to erase.
    Rubber,
    Brush,
    Pencil,
    /// Designed to work above the surface, making extensive use of the
    /// distance and tilt axes.
    Airbrush,
    Finger,
    /// An emulated stylus from mouse input.
    Mouse,
    /// A mouse-like device resting on the pad with a transparent crosshair.
    Lens,
}

impl ToolType {
    /// Map a `BTN_TOOL_*` announcement code to its tool type.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            codes::BTN_TOOL_PEN => Some(Self::Pen),
            codes::BTN_TOOL_RUBBER => Some(Self::Rubber),
            codes::BTN_TOOL_BRUSH => Some(Self::Brush),
            codes::BTN_TOOL_PENCIL => Some(Self::Pencil),
            codes::BTN_TOOL_AIRBRUSH => Some(Self::Airbrush),
            codes::BTN_TOOL_FINGER => Some(Self::Finger),
            codes::BTN_TOOL_MOUSE => Some(Self::Mouse),
            codes::BTN_TOOL_LENS => Some(Self::Lens),
            _ => None,
        }
    }
}

/// Opaque handle to a tool in its registry. Copyable; resolve it through
/// [`ToolRegistry::get`]. Stable for as long as the tool stays registered,
/// including across proximity cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ToolId(u32);

/// A registered tool identity.
#[derive(Debug)]
pub struct Tool {
    id: ToolId,
    tool_type: ToolType,
    serial: u32,
}

impl Tool {
    #[must_use]
    pub fn id(&self) -> ToolId {
        self.id
    }

    #[must_use]
    pub fn tool_type(&self) -> ToolType {
        self.tool_type
    }

    /// Hardware serial announced over `MSC_SERIAL`, zero when the tool never
    /// announced one.
    #[must_use]
    pub fn serial(&self) -> u32 {
        self.serial
    }
}

struct Entry {
    tool: Tool,
    refcount: u32,
}

/// Per-device, insertion-ordered collection of tool identities keyed by
/// `(type, serial)`.
///
/// Reference counts gate removal: a tool leaves the registry only when its
/// count hits zero *and* it is not the device's active tool. The dispatcher
/// holds one reference while a tool is in proximity; consumers that want a
/// tool kept alive take their own with [`acquire`](Self::acquire). None of
/// this is thread-safe - the owning dispatcher's thread serializes access.
#[derive(Default)]
pub struct ToolRegistry {
    // A linear scan is gonna be much more efficient than the alternatives
    // for any reasonable number of tools.
    entries: Vec<Entry>,
    next_id: u32,
    active: Option<ToolId>,
}

impl ToolRegistry {
    /// Fetch-or-create the tool for `(tool_type, serial)` and take a
    /// reference on it. First sight of a pair inserts it with a count of
    /// one.
    pub fn acquire(&mut self, tool_type: ToolType, serial: u32) -> ToolId {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.tool.tool_type == tool_type && e.tool.serial == serial)
        {
            entry.refcount += 1;
            return entry.tool.id;
        }
        let id = ToolId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            tool: Tool {
                id,
                tool_type,
                serial,
            },
            refcount: 1,
        });
        id
    }

    /// Drop a reference. At zero, the tool is removed unless it is still the
    /// device's active tool; an active tool at count zero lingers so a
    /// returning `(type, serial)` pair resolves to the same handle.
    pub fn release(&mut self, id: ToolId) {
        let Some(index) = self.entries.iter().position(|e| e.tool.id == id) else {
            tracing::warn!(?id, "release of unregistered tool");
            return;
        };
        let entry = &mut self.entries[index];
        if entry.refcount == 0 {
            tracing::warn!(?id, "release of tool with zero references");
            return;
        }
        entry.refcount -= 1;
        if entry.refcount == 0 && self.active != Some(id) {
            self.entries.remove(index);
        }
    }

    /// The tool currently held in proximity by the device, if any.
    #[must_use]
    pub fn active_tool(&self) -> Option<ToolId> {
        self.active
    }

    pub(crate) fn set_active(&mut self, id: Option<ToolId>) {
        self.active = id;
    }

    #[must_use]
    pub fn get(&self, id: ToolId) -> Option<&Tool> {
        self.entries
            .iter()
            .find(|e| e.tool.id == id)
            .map(|e| &e.tool)
    }

    /// Registered tools in insertion order.
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.entries.iter().map(|e| &e.tool)
    }

    #[cfg(test)]
    pub(crate) fn refcount(&self, id: ToolId) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.tool.id == id)
            .map(|e| e.refcount)
    }
}

#[cfg(test)]
mod tests {
    use super::{ToolRegistry, ToolType};

    #[test]
    fn same_identity_resolves_to_same_handle() {
        let mut registry = ToolRegistry::default();
        let first = registry.acquire(ToolType::Pen, 0xA1);
        let second = registry.acquire(ToolType::Pen, 0xA1);
        assert_eq!(first, second);
        assert_eq!(registry.refcount(first), Some(2));
        // A different serial is a different physical tool.
        let other = registry.acquire(ToolType::Pen, 0xB2);
        assert_ne!(first, other);
        // ...as is the eraser end sharing the serial.
        let eraser = registry.acquire(ToolType::Rubber, 0xA1);
        assert_ne!(first, eraser);
    }

    #[test]
    fn release_removes_only_inactive_tools() {
        let mut registry = ToolRegistry::default();
        let id = registry.acquire(ToolType::Pen, 1);
        registry.set_active(Some(id));
        registry.release(id);
        // Still active, so the zero-count tool lingers for re-identification.
        assert!(registry.get(id).is_some());
        assert_eq!(registry.refcount(id), Some(0));

        registry.set_active(None);
        let again = registry.acquire(ToolType::Pen, 1);
        assert_eq!(again, id);
        registry.release(id);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn consumer_reference_outlives_proximity() {
        let mut registry = ToolRegistry::default();
        let id = registry.acquire(ToolType::Brush, 7);
        registry.set_active(Some(id));
        let held = registry.acquire(ToolType::Brush, 7);
        assert_eq!(held, id);

        // Proximity out: dispatcher drops its reference and the active mark.
        registry.release(id);
        registry.set_active(None);
        assert!(registry.get(id).is_some());

        registry.release(held);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut registry = ToolRegistry::default();
        registry.acquire(ToolType::Pen, 1);
        registry.acquire(ToolType::Rubber, 1);
        registry.acquire(ToolType::Airbrush, 9);
        let types: Vec<ToolType> = registry.tools().map(super::Tool::tool_type).collect();
        assert_eq!(
            types,
            vec![ToolType::Pen, ToolType::Rubber, ToolType::Airbrush]
        );
    }
}
