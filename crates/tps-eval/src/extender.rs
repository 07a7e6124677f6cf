use tps_core::{OptionParams, QueryContext, TacticalPoint};

use crate::deferred::DeferredRequest;
use crate::object::ObjectRef;

/// Everything a generator needs to produce candidate points.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    /// Name of the generator word.
    pub generator: &'a str,
    pub context: &'a QueryContext,
    pub search_distance: f32,
    pub params: &'a OptionParams,
    /// The object generated around.
    pub object: ObjectRef,
    /// The secondary object of a generator-with-object word (e.g. the threat to hide from).
    pub object_aux: Option<ObjectRef>,
}

/// Host hooks that give meaning to words the engine cannot evaluate on its own.
///
/// Every hook is keyed by the word's name and returns `None` (or `false`) when the extender
/// does not handle that word. Extenders are consulted in registration order and the first
/// answer wins.
pub trait LanguageExtender {
    /// Appends points for `request.generator`. Only counts as handled when points were added.
    fn generate_points(
        &self,
        _request: &GenerateRequest<'_>,
        _out: &mut Vec<TacticalPoint>,
    ) -> bool {
        false
    }

    fn object(&self, _name: &str, _context: &QueryContext) -> Option<ObjectRef> {
        None
    }

    fn bool_property(
        &self,
        _name: &str,
        _context: &QueryContext,
        _point: &TacticalPoint,
    ) -> Option<bool> {
        None
    }

    fn bool_test(
        &self,
        _name: &str,
        _context: &QueryContext,
        _object: &ObjectRef,
        _point: &TacticalPoint,
    ) -> Option<bool> {
        None
    }

    fn real_property(
        &self,
        _name: &str,
        _context: &QueryContext,
        _point: &TacticalPoint,
    ) -> Option<f32> {
        None
    }

    fn real_measure(
        &self,
        _name: &str,
        _context: &QueryContext,
        _object: &ObjectRef,
        _point: &TacticalPoint,
    ) -> Option<f32> {
        None
    }

    /// `(min, max)` used to normalise a real word into a weight.
    fn real_range(&self, _name: &str) -> Option<(f32, f32)> {
        None
    }

    /// Requests to issue for a deferred word the engine has no built-in handling for.
    ///
    /// Boolean words pass when every request reports a clear result; real words take the first
    /// reported distance.
    fn deferred_requests(
        &self,
        _name: &str,
        _context: &QueryContext,
        _object: Option<&ObjectRef>,
        _point: &TacticalPoint,
    ) -> Option<Vec<DeferredRequest>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtenderId(pub u32);

/// Ordered list of registered extenders.
#[derive(Default)]
pub struct ExtenderRegistry {
    entries: Vec<(ExtenderId, Box<dyn LanguageExtender>)>,
    next_id: u32,
}

impl ExtenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, extender: Box<dyn LanguageExtender>) -> ExtenderId {
        let id = ExtenderId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, extender));
        id
    }

    pub fn remove(&mut self, id: ExtenderId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First non-`None` answer across extenders, in registration order.
    pub fn first<T>(&self, mut ask: impl FnMut(&dyn LanguageExtender) -> Option<T>) -> Option<T> {
        for (_, extender) in &self.entries {
            if let Some(answer) = ask(extender.as_ref()) {
                return Some(answer);
            }
        }
        None
    }
}

impl core::fmt::Debug for ExtenderRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExtenderRegistry")
            .field("len", &self.entries.len())
            .finish()
    }
}
