//! Hit-testing and add/remove edits over the live detection sets.

use std::collections::BTreeMap;

use crate::history::{Action, Target, UndoRedoLog};
use crate::model::{
    BlobCandidate, ContourId, ContourRegion, Keypoint, KeypointId, Origin, RegionCandidate,
};
use crate::params::NEW_KEYPOINT_RADIUS;

/// Outcome of a single [`CorrectionEngine::hit_test`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    RemovedKeypoint(KeypointId),
    RemovedContour(ContourId),
    AddedKeypoint(KeypointId),
}

#[derive(Debug, Clone)]
pub struct CorrectionEngine {
    keypoints: BTreeMap<KeypointId, Keypoint>,
    contours: BTreeMap<ContourId, ContourRegion>,
    log: UndoRedoLog<Action>,
    next_id: u64,
    new_keypoint_radius: f32,
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self::new(NEW_KEYPOINT_RADIUS)
    }
}

impl CorrectionEngine {
    pub fn new(new_keypoint_radius: f32) -> Self {
        Self {
            keypoints: BTreeMap::new(),
            contours: BTreeMap::new(),
            log: UndoRedoLog::new(),
            next_id: 0,
            new_keypoint_radius,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.values()
    }

    pub fn contours(&self) -> impl Iterator<Item = &ContourRegion> {
        self.contours.values()
    }

    pub fn keypoint_count(&self) -> usize {
        self.keypoints.len()
    }

    pub fn contour_count(&self) -> usize {
        self.contours.len()
    }

    /// Keypoints plus contours.
    pub fn total(&self) -> usize {
        self.keypoints.len() + self.contours.len()
    }

    pub fn history(&self) -> &UndoRedoLog<Action> {
        &self.log
    }

    pub fn set_new_keypoint_radius(&mut self, radius: f32) {
        self.new_keypoint_radius = radius;
    }

    /// Swaps in a fresh detection. Manual keypoints survive; auto keypoints,
    /// contours and the whole history are dropped.
    pub fn replace_detection(&mut self, blobs: &[BlobCandidate], regions: Vec<RegionCandidate>) {
        self.keypoints.retain(|_, kp| kp.origin == Origin::Manual);
        self.contours.clear();
        self.log.clear();

        for blob in blobs {
            let id = KeypointId(self.next_id());
            self.keypoints.insert(
                id,
                Keypoint {
                    id,
                    center: blob.center,
                    radius: blob.radius,
                    origin: Origin::Auto,
                },
            );
        }
        for region in regions {
            let id = ContourId(self.next_id());
            self.contours.insert(
                id,
                ContourRegion {
                    id,
                    points: region.points,
                    area: region.area,
                    bbox: region.bbox,
                },
            );
        }
    }

    /// Removes the keypoint or contour under `point`, or places a manual
    /// keypoint there when nothing is hit. Keypoints take precedence.
    pub fn hit_test(&mut self, point: (f32, f32)) -> Correction {
        let hit = self
            .keypoints
            .values()
            .find(|kp| kp.contains(point))
            .map(|kp| kp.id);
        if let Some(id) = hit
            && let Some(kp) = self.keypoints.remove(&id)
        {
            self.log.push(Action::Remove(Target::Keypoint(kp)));
            return Correction::RemovedKeypoint(id);
        }

        let hit = self
            .contours
            .values()
            .find(|c| c.contains(point))
            .map(|c| c.id);
        if let Some(id) = hit
            && let Some(contour) = self.contours.remove(&id)
        {
            self.log.push(Action::Remove(Target::Contour(contour)));
            return Correction::RemovedContour(id);
        }

        let id = KeypointId(self.next_id());
        let kp = Keypoint {
            id,
            center: point,
            radius: self.new_keypoint_radius,
            origin: Origin::Manual,
        };
        self.keypoints.insert(id, kp.clone());
        self.log.push(Action::Add(Target::Keypoint(kp)));
        Correction::AddedKeypoint(id)
    }

    /// Reverts the newest action; `None` means nothing to undo.
    pub fn undo(&mut self) -> Option<Action> {
        let action = self.log.undo()?.clone();
        match &action {
            Action::Add(target) => self.detach(target),
            Action::Remove(target) => self.attach(target),
        }
        Some(action)
    }

    pub fn redo(&mut self) -> Option<Action> {
        let action = self.log.redo()?.clone();
        match &action {
            Action::Add(target) => self.attach(target),
            Action::Remove(target) => self.detach(target),
        }
        Some(action)
    }

    fn attach(&mut self, target: &Target) {
        match target {
            Target::Keypoint(kp) => {
                self.keypoints.insert(kp.id, kp.clone());
            }
            Target::Contour(c) => {
                self.contours.insert(c.id, c.clone());
            }
        }
    }

    fn detach(&mut self, target: &Target) {
        match target {
            Target::Keypoint(kp) => {
                self.keypoints.remove(&kp.id);
            }
            Target::Contour(c) => {
                self.contours.remove(&c.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoundingBox;

    fn square(x: i32, y: i32, side: i32) -> RegionCandidate {
        let points = vec![(x, y), (x + side, y), (x + side, y + side), (x, y + side)];
        RegionCandidate {
            bbox: BoundingBox::of(&points).unwrap(),
            area: (side * side) as f32,
            points,
        }
    }

    fn engine() -> CorrectionEngine {
        let mut engine = CorrectionEngine::default();
        let blobs = [
            BlobCandidate {
                center: (20.0, 20.0),
                radius: 8.0,
            },
            BlobCandidate {
                center: (60.0, 20.0),
                radius: 8.0,
            },
        ];
        engine.replace_detection(&blobs, vec![square(100, 100, 20)]);
        engine
    }

    fn snapshot(engine: &CorrectionEngine) -> (Vec<Keypoint>, Vec<ContourRegion>) {
        (
            engine.keypoints().cloned().collect(),
            engine.contours().cloned().collect(),
        )
    }

    #[test]
    fn center_hit_removes_without_duplicating() {
        let mut engine = engine();
        let outcome = engine.hit_test((20.0, 20.0));
        assert!(matches!(outcome, Correction::RemovedKeypoint(_)));
        assert_eq!(engine.keypoint_count(), 1);
        assert!(engine.keypoints().all(|kp| kp.center != (20.0, 20.0)));
    }

    #[test]
    fn contour_hit_removes_contour() {
        let mut engine = engine();
        assert!(matches!(
            engine.hit_test((110.0, 110.0)),
            Correction::RemovedContour(_)
        ));
        assert_eq!(engine.contour_count(), 0);
        assert_eq!(engine.total(), 2);
    }

    #[test]
    fn miss_adds_one_manual_keypoint() {
        let mut engine = engine();
        let before = engine.total();
        let Correction::AddedKeypoint(id) = engine.hit_test((200.0, 10.0)) else {
            panic!("expected an added keypoint");
        };
        assert_eq!(engine.total(), before + 1);
        let kp = engine.keypoints().find(|kp| kp.id == id).unwrap();
        assert_eq!(kp.radius, NEW_KEYPOINT_RADIUS);
        assert_eq!(kp.origin, Origin::Manual);
    }

    #[test]
    fn undo_then_redo_restores_the_same_state() {
        let mut engine = engine();
        engine.hit_test((200.0, 10.0));
        engine.hit_test((60.0, 20.0));
        engine.hit_test((105.0, 115.0));
        let after = snapshot(&engine);

        for _ in 0..3 {
            assert!(engine.undo().is_some());
        }
        assert!(engine.undo().is_none());
        assert_eq!(engine.total(), 3);
        for _ in 0..3 {
            assert!(engine.redo().is_some());
        }
        assert!(engine.redo().is_none());
        assert_eq!(snapshot(&engine), after);
    }

    #[test]
    fn new_edit_after_undo_drops_redo() {
        let mut engine = engine();
        engine.hit_test((200.0, 10.0));
        engine.undo();
        assert!(engine.history().can_redo());
        engine.hit_test((300.0, 10.0));
        assert!(!engine.history().can_redo());
    }

    #[test]
    fn redetection_keeps_manual_keypoints_only() {
        let mut engine = engine();
        engine.hit_test((200.0, 10.0));
        engine.replace_detection(
            &[BlobCandidate {
                center: (40.0, 40.0),
                radius: 5.0,
            }],
            Vec::new(),
        );
        assert_eq!(engine.keypoint_count(), 2);
        assert_eq!(engine.contour_count(), 0);
        assert!(!engine.history().can_undo());
        let ids: Vec<KeypointId> = engine.keypoints().map(|kp| kp.id).collect();
        let mut unique = ids.clone();
        unique.dedup();
        assert_eq!(ids, unique);
    }
}
