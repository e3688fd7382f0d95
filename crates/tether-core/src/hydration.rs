//! Hydration Engine
//!
//! Fetches root instances and attaches the relationships named by a list of
//! paths, depth first. Within one call:
//! - every path is validated before the first query
//! - a segment already resolved (a shared prefix like `cars` in
//!   `cars.driver` and `cars.wheels`) is reused
//! - resolutions are memoized by `(target, foreign key, key value)`
//! - a segment that resolves to nothing stops deeper segments
//!
//! A call either returns the fully hydrated graph or an error.

use std::collections::HashMap;
use std::time::Instant;

use crate::core_types::schema::{OP_HYDRATE, OP_LOAD};
use crate::errors::Result;
use crate::gateway::Gateway;
use crate::model::{EntityInstance, KeyValue, Related};
use crate::path::RelationPath;
use crate::predicate::Predicate;
use crate::resolver::{collapse, log_resolution, source_key_value, Resolver};
use crate::{log_op_end, log_op_error, log_op_start};

pub struct Hydrator<'g> {
    gateway: &'g dyn Gateway,
}

impl<'g> Hydrator<'g> {
    pub fn new(gateway: &'g dyn Gateway) -> Self {
        Self { gateway }
    }

    /// Find every `entity` matching `predicate` and resolve `paths` on each
    ///
    /// # Errors
    ///
    /// `UnknownEntity`, `UnknownField`, `UnknownRelationship` for a path
    /// segment that does not exist, `MultipleMatches`, or any gateway error.
    pub fn load(
        &self,
        entity: &str,
        predicate: &Predicate,
        paths: &[RelationPath],
    ) -> Result<Vec<EntityInstance>> {
        self.observe(OP_LOAD, entity, paths, |session| {
            validate_paths(session.gateway, entity, paths)?;
            let mut roots = session.find_many(entity, predicate)?;
            session.attach_all(&mut roots, paths)?;
            Ok(roots)
        })
    }

    /// First `entity` matching `predicate`, hydrated along `paths`
    ///
    /// # Errors
    ///
    /// As for `load`.
    pub fn load_one(
        &self,
        entity: &str,
        predicate: &Predicate,
        paths: &[RelationPath],
    ) -> Result<Option<EntityInstance>> {
        let roots = self.observe(OP_LOAD, entity, paths, |session| {
            validate_paths(session.gateway, entity, paths)?;
            let mut roots: Vec<_> = session.find_one(entity, predicate)?.into_iter().collect();
            session.attach_all(&mut roots, paths)?;
            Ok(roots)
        })?;
        Ok(roots.into_iter().next())
    }

    /// Resolve `paths` on instances the caller already holds
    ///
    /// Works on copies; `instances` is never modified. Relationships already
    /// resolved on an input are kept and reused.
    ///
    /// # Errors
    ///
    /// As for `load`.
    pub fn hydrate(
        &self,
        instances: &[EntityInstance],
        paths: &[RelationPath],
    ) -> Result<Vec<EntityInstance>> {
        let entity = instances.first().map_or("", EntityInstance::entity);
        self.observe(OP_HYDRATE, entity, paths, |session| {
            let mut checked: Vec<&str> = Vec::new();
            for instance in instances {
                if !checked.contains(&instance.entity()) {
                    validate_paths(session.gateway, instance.entity(), paths)?;
                    checked.push(instance.entity());
                }
            }
            let mut copies = instances.to_vec();
            session.attach_all(&mut copies, paths)?;
            Ok(copies)
        })
    }

    fn observe<F>(
        &self,
        op: &str,
        entity: &str,
        paths: &[RelationPath],
        run: F,
    ) -> Result<Vec<EntityInstance>>
    where
        F: FnOnce(&mut Session<'g>) -> Result<Vec<EntityInstance>>,
    {
        let started = Instant::now();
        log_op_start!(op, entity = entity, path_count = paths.len());

        let mut session = Session::new(self.gateway);
        let result = run(&mut session);

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(roots) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    entity = entity,
                    root_count = roots.len(),
                    query_count = session.queries
                );
            }
            Err(err) => {
                log_op_error!(
                    op,
                    err,
                    duration_ms = duration_ms,
                    entity = entity,
                    query_count = session.queries
                );
            }
        }
        result
    }
}

fn validate_paths(gateway: &dyn Gateway, root: &str, paths: &[RelationPath]) -> Result<()> {
    for path in paths {
        path.validate(gateway.schema(), root)?;
    }
    Ok(())
}

type CacheKey = (String, String, KeyValue);

/// Per-call state: memoized resolutions and the backend query count
struct Session<'g> {
    gateway: &'g dyn Gateway,
    cache: HashMap<CacheKey, Vec<EntityInstance>>,
    queries: usize,
}

impl<'g> Session<'g> {
    fn new(gateway: &'g dyn Gateway) -> Self {
        Self {
            gateway,
            cache: HashMap::new(),
            queries: 0,
        }
    }

    fn find_many(&mut self, entity: &str, predicate: &Predicate) -> Result<Vec<EntityInstance>> {
        self.queries += 1;
        self.gateway.find_many(entity, predicate)
    }

    fn find_one(&mut self, entity: &str, predicate: &Predicate) -> Result<Option<EntityInstance>> {
        self.queries += 1;
        self.gateway.find_one(entity, predicate)
    }

    fn attach_all(&mut self, instances: &mut [EntityInstance], paths: &[RelationPath]) -> Result<()> {
        for path in paths {
            self.attach(instances, path.segments())?;
        }
        Ok(())
    }

    fn attach(&mut self, instances: &mut [EntityInstance], segments: &[String]) -> Result<()> {
        let Some((head, rest)) = segments.split_first() else {
            return Ok(());
        };
        for instance in instances.iter_mut() {
            if !instance.is_resolved(head) {
                let related = self.resolve(instance, head)?;
                instance.set_relation(head, related);
            }
            if rest.is_empty() {
                continue;
            }
            if let Some(slot) = instance.relation_mut(head) {
                self.attach(slot.instances_mut(), rest)?;
            }
        }
        Ok(())
    }

    fn resolve(&mut self, instance: &EntityInstance, name: &str) -> Result<Related> {
        let gateway = self.gateway;
        let rel = gateway.schema().relationship(instance.entity(), name)?;
        let Some(key) = source_key_value(instance, rel) else {
            log_resolution(rel, 0, false);
            return Ok(rel.empty());
        };

        let cache_key = (rel.target.clone(), rel.foreign_key.clone(), key);
        let matches = match self.cache.get(&cache_key) {
            Some(hit) => hit.clone(),
            None => {
                self.queries += 1;
                let fetched = Resolver::new(gateway).fetch(rel, &cache_key.2)?;
                log_resolution(rel, fetched.len(), true);
                self.cache.insert(cache_key, fetched.clone());
                fetched
            }
        };
        collapse(rel, matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::logging_facility::test_capture::init_test_capture;
    use crate::model::Value;
    use crate::test_support::{gear_shift_schema, values, MemoryGateway};
    use tether_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

    fn seeded() -> MemoryGateway {
        let gateway = MemoryGateway::new(gear_shift_schema());
        for gear in ["automatic", "manual", "semi-automatic"] {
            gateway
                .insert("GearShift", values([("name", Value::from(gear))]))
                .unwrap();
            for n in 1..=2 {
                gateway
                    .insert(
                        "MediumCar",
                        values([
                            ("name", Value::from(format!("{}-{}", gear, n))),
                            ("gearShiftId", Value::from(gear)),
                        ]),
                    )
                    .unwrap();
            }
        }
        for (name, gear) in [("Ann", Some("automatic")), ("Bob", None)] {
            gateway
                .insert(
                    "MediumDriver",
                    values([("name", Value::from(name)), ("preferredGearShiftId", Value::from(gear))]),
                )
                .unwrap();
        }
        gateway.reset_queries();
        gateway
    }

    fn paths(list: &[&str]) -> Vec<RelationPath> {
        list.iter().map(|p| RelationPath::parse(p).unwrap()).collect()
    }

    #[test]
    fn test_load_nested_path() {
        let gateway = seeded();
        let ann = Hydrator::new(&gateway)
            .load_one(
                "MediumDriver",
                &Predicate::eq("name", "Ann"),
                &paths(&["preferredGearShift.cars"]),
            )
            .unwrap()
            .unwrap();

        let gear = ann.relation("preferredGearShift").as_one().unwrap();
        let cars = gear.relation("cars").instances();
        assert_eq!(cars.len(), 2);
        assert!(cars.iter().all(|c| c.get("gearShiftId") == &Value::from("automatic")));
        assert!(!cars[0].is_resolved("gearShift"));
    }

    #[test]
    fn test_null_head_stops_deeper_segments() {
        let gateway = seeded();
        let bob = Hydrator::new(&gateway)
            .load_one(
                "MediumDriver",
                &Predicate::eq("name", "Bob"),
                &paths(&["preferredGearShift.cars"]),
            )
            .unwrap()
            .unwrap();
        assert_eq!(bob.relation("preferredGearShift"), &Related::None);
        // Only the root lookup reached the backend
        assert_eq!(gateway.query_count(), 1);
    }

    #[test]
    fn test_shared_targets_are_fetched_once() {
        let gateway = seeded();
        let cars = Hydrator::new(&gateway)
            .load("MediumCar", &Predicate::all(), &paths(&["gearShift"]))
            .unwrap();
        assert_eq!(cars.len(), 6);
        assert!(cars.iter().all(|c| c.relation("gearShift").as_one().is_some()));
        // One root query, then one per distinct gear shift
        assert_eq!(gateway.query_count(), 1 + 3);
    }

    #[test]
    fn test_shared_prefix_is_reused() {
        let gateway = seeded();
        let cars = Hydrator::new(&gateway)
            .load(
                "MediumCar",
                &Predicate::eq("name", "manual-1"),
                &paths(&["gearShift", "gearShift.cars"]),
            )
            .unwrap();
        let gear = cars[0].relation("gearShift").as_one().unwrap();
        assert_eq!(gear.relation("cars").instances().len(), 2);
        assert_eq!(gateway.query_count(), 3);
    }

    #[test]
    fn test_invalid_path_fails_before_any_query() {
        let gateway = seeded();
        let err = Hydrator::new(&gateway)
            .load("MediumCar", &Predicate::all(), &paths(&["gearShift", "wheels"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownRelationship);
        assert_eq!(gateway.query_count(), 0);
    }

    #[test]
    fn test_unnamed_relationships_stay_unresolved() {
        let gateway = seeded();
        let gears = Hydrator::new(&gateway)
            .load("GearShift", &Predicate::all(), &[])
            .unwrap();
        assert_eq!(gears.len(), 3);
        assert!(gears.iter().all(|g| !g.is_resolved("cars")));
    }

    #[test]
    fn test_hydrate_leaves_input_untouched() {
        let gateway = seeded();
        let gears = gateway.find_many("GearShift", &Predicate::all()).unwrap();
        let hydrated = Hydrator::new(&gateway)
            .hydrate(&gears, &paths(&["cars"]))
            .unwrap();
        assert!(gears.iter().all(|g| !g.is_resolved("cars")));
        assert!(hydrated.iter().all(|g| g.relation("cars").instances().len() == 2));
    }

    #[test]
    fn test_load_emits_one_start_and_one_end() {
        let capture = init_test_capture();
        let gateway = seeded();
        Hydrator::new(&gateway)
            .load("MediumDriver", &Predicate::all(), &paths(&["preferredGearShift"]))
            .unwrap();

        let events = capture.events_with(OP_LOAD, "entity", "MediumDriver");
        let starts = events.iter().filter(|e| e.event() == Some(EVENT_START)).count();
        let ends: Vec<_> = events
            .iter()
            .filter(|e| e.event() == Some(EVENT_END))
            .collect();
        assert!(starts >= 1);
        assert!(!ends.is_empty());
        assert!(ends.iter().any(|e| e.field("root_count") == Some("2")));
    }

    #[test]
    fn test_failed_hydrate_emits_end_error() {
        let capture = init_test_capture();
        let gateway = seeded();
        let gears = gateway.find_many("GearShift", &Predicate::all()).unwrap();
        let err = Hydrator::new(&gateway)
            .hydrate(&gears, &paths(&["drivers"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownRelationship);

        let errors = capture.count_events(|e| {
            e.op() == Some(OP_HYDRATE)
                && e.event() == Some(EVENT_END_ERROR)
                && e.field("err_code") == Some("ERR_UNKNOWN_RELATIONSHIP")
        });
        assert!(errors >= 1);
    }
}
