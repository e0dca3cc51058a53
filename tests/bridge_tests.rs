//! Bridge tests against the headless host

#[cfg(test)]
mod tests {
    use logic_bridge::{
        headless::HeadlessHost, ActionState, ActorClass, ActorHandle, BodyHandle, Bridge,
        BridgeConfig, BridgeError, Color, ComponentDescriptor, ComponentFilter, ComponentKind,
        Entity, Quaternion, RebindPolicy, SpatialData, Vector3,
    };

    fn make_bridge(rebind_policy: RebindPolicy) -> Bridge {
        let config = BridgeConfig {
            rebind_policy,
            ..Default::default()
        };
        Bridge::new(config, Box::new(HeadlessHost::new()))
    }

    fn host(bridge: &mut Bridge) -> &mut HeadlessHost {
        bridge
            .downcast_host_mut::<HeadlessHost>()
            .expect("headless host installed")
    }

    fn spawn_at(bridge: &mut Bridge, x: f32, y: f32, z: f32) -> ActorHandle {
        bridge.spawn(0, SpatialData::at(Vector3::new(x, y, z)))
    }

    fn components(
        bridge: &mut Bridge,
        actor: ActorHandle,
        filter: ComponentFilter,
    ) -> Vec<ComponentDescriptor> {
        let total = bridge.components(actor, filter, None).expect("live actor");
        let mut out = vec![ComponentDescriptor::default(); total];
        let written = bridge
            .components(actor, filter, Some(&mut out))
            .expect("live actor");
        out.truncate(written);
        out
    }

    fn body_of(bridge: &mut Bridge, actor: ActorHandle) -> BodyHandle {
        components(bridge, actor, ComponentFilter::Primitive)
            .iter()
            .find_map(ComponentDescriptor::as_body)
            .expect("default actor has a primitive")
    }

    fn simulating_body(bridge: &mut Bridge, actor: ActorHandle) -> BodyHandle {
        let body = body_of(bridge, actor);
        assert!(host(bridge).set_simulating(body, true));
        body
    }

    fn bound_actors(bridge: &Bridge) -> Vec<ActorHandle> {
        let mut out = vec![ActorHandle::NULL; bridge.bound_actors(None)];
        let written = bridge.bound_actors(Some(&mut out));
        out.truncate(written);
        out
    }

    // -----------------------------------------------------------------------
    // Spawning & spatial data
    // -----------------------------------------------------------------------

    #[test]
    fn spawn_places_actor_at_requested_transform() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 100.0);

        assert!(!actor.is_null());
        let data = bridge.spatial_data(actor).unwrap();
        assert_eq!(data.position, Vector3::new(0.0, 0.0, 100.0));
        assert_eq!(data.rotation, Quaternion::IDENTITY);
        assert_eq!(data.scale, Vector3::ONE);
        assert_eq!(bridge.stats().spawned, 1);
    }

    #[test]
    fn spawn_honours_scale() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let spatial = SpatialData {
            scale: Vector3::new(2.0, 2.0, 2.0),
            ..SpatialData::IDENTITY
        };
        let actor = bridge.spawn(0, spatial);
        assert_eq!(bridge.spatial_data(actor).unwrap().scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn set_spatial_data_is_read_back() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let data = SpatialData {
            position: Vector3::new(10.0, -20.0, 30.0),
            rotation: Quaternion::new(0.0, 0.0, 1.0, 0.0),
            scale: Vector3::new(1.0, 2.0, 3.0),
        };
        bridge.set_spatial_data(actor, data).unwrap();
        assert_eq!(bridge.spatial_data(actor).unwrap(), data);
    }

    #[test]
    fn class_tags_select_the_class_table_entry() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = bridge.spawn(0, SpatialData::IDENTITY);
        let camera = bridge.spawn(1, SpatialData::IDENTITY);

        assert_eq!(host(&mut bridge).class_of(actor), Some(ActorClass::DefaultActor));
        assert_eq!(host(&mut bridge).class_of(camera), Some(ActorClass::CameraActor));
        let kinds: Vec<_> = components(&mut bridge, camera, ComponentFilter::Any)
            .iter()
            .map(|c| c.kind)
            .collect();
        assert!(kinds.contains(&ComponentKind::Camera));
        assert_eq!(bridge.stats().fallbacks, 0);
    }

    #[test]
    fn unknown_class_tag_uses_fallback_class() {
        let config = BridgeConfig {
            fallback_class: ActorClass::CameraActor,
            ..Default::default()
        };
        let mut bridge = Bridge::new(config, Box::new(HeadlessHost::new()));
        let actor = bridge.spawn(99, SpatialData::IDENTITY);

        assert!(!actor.is_null());
        assert_eq!(host(&mut bridge).class_of(actor), Some(ActorClass::CameraActor));
        assert_eq!(bridge.stats().fallbacks, 1);
    }

    #[test]
    fn view_target_follows_live_actor() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let camera = bridge.spawn(1, SpatialData::IDENTITY);
        bridge.set_view_target(camera).unwrap();
        assert_eq!(host(&mut bridge).view_target(), Some(camera));

        host(&mut bridge).destroy_actor(camera);
        assert_eq!(host(&mut bridge).view_target(), None);
        assert!(bridge.set_view_target(camera).is_err());
    }

    // -----------------------------------------------------------------------
    // Entity binding
    // -----------------------------------------------------------------------

    #[test]
    fn bound_actor_is_enumerated_with_its_entity() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 100.0);
        bridge.bind(actor, Entity::new(42)).unwrap();

        assert_eq!(bridge.bound_actors(None), 1);
        let mut out = [ActorHandle::NULL; 1];
        assert_eq!(bridge.bound_actors(Some(&mut out)), 1);
        assert_eq!(out[0], actor);
        assert_eq!(bridge.entity_for_actor(actor).unwrap(), Some(Entity::new(42)));
    }

    #[test]
    fn unbound_actors_are_not_enumerated() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let a = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let b = spawn_at(&mut bridge, 100.0, 0.0, 0.0);
        let _c = spawn_at(&mut bridge, 200.0, 0.0, 0.0);
        bridge.bind(b, Entity::new(7)).unwrap();

        assert_eq!(bound_actors(&bridge), vec![b]);
        assert_eq!(bridge.entity_for_actor(a).unwrap(), None);
    }

    #[test]
    fn rebinding_same_entity_is_a_no_op() {
        let mut bridge = make_bridge(RebindPolicy::Reject);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        bridge.bind(actor, Entity::new(42)).unwrap();
        bridge.bind(actor, Entity::new(42)).unwrap();

        let markers = components(&mut bridge, actor, ComponentFilter::Any)
            .iter()
            .filter(|c| c.kind == ComponentKind::EntityMarker)
            .count();
        assert_eq!(markers, 1);
        assert_eq!(bridge.stats().bound, 1);
    }

    #[test]
    fn replace_policy_swaps_the_marker() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        bridge.bind(actor, Entity::new(1)).unwrap();
        bridge.bind(actor, Entity::new(2)).unwrap();

        assert_eq!(bridge.entity_for_actor(actor).unwrap(), Some(Entity::new(2)));
        let markers = components(&mut bridge, actor, ComponentFilter::Any)
            .iter()
            .filter(|c| c.kind == ComponentKind::EntityMarker)
            .count();
        assert_eq!(markers, 1);
    }

    #[test]
    fn reject_policy_keeps_the_first_entity() {
        let mut bridge = make_bridge(RebindPolicy::Reject);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        bridge.bind(actor, Entity::new(1)).unwrap();

        let err = bridge.bind(actor, Entity::new(2)).unwrap_err();
        assert_eq!(
            err,
            BridgeError::AlreadyBound {
                actor: actor.to_raw(),
                existing: 1,
            }
        );
        assert_eq!(bridge.entity_for_actor(actor).unwrap(), Some(Entity::new(1)));
    }

    #[test]
    fn stacked_markers_enumerate_the_actor_once() {
        let mut bridge = make_bridge(RebindPolicy::Stack);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        bridge.bind(actor, Entity::new(1)).unwrap();
        bridge.bind(actor, Entity::new(2)).unwrap();

        let markers = components(&mut bridge, actor, ComponentFilter::Any)
            .iter()
            .filter(|c| c.kind == ComponentKind::EntityMarker)
            .count();
        assert_eq!(markers, 2);
        assert_eq!(bound_actors(&bridge), vec![actor]);
        assert_eq!(bridge.stats().bound, 2);
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    #[test]
    fn component_filter_selects_primitives_or_everything() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);

        assert_eq!(bridge.components(actor, ComponentFilter::Primitive, None), Ok(1));
        assert_eq!(bridge.components(actor, ComponentFilter::Any, None), Ok(2));

        bridge.bind(actor, Entity::new(5)).unwrap();
        assert_eq!(bridge.components(actor, ComponentFilter::Primitive, None), Ok(1));
        assert_eq!(bridge.components(actor, ComponentFilter::Any, None), Ok(3));
    }

    #[test]
    fn component_fill_stops_at_capacity() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);

        let mut out = [ComponentDescriptor::default(); 1];
        assert_eq!(bridge.components(actor, ComponentFilter::Any, Some(&mut out)), Ok(1));
        assert_ne!(out[0], ComponentDescriptor::default());
    }

    #[test]
    fn components_of_stale_actor_is_an_error() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        host(&mut bridge).destroy_actor(actor);

        assert!(matches!(
            bridge.components(actor, ComponentFilter::Any, None),
            Err(BridgeError::StaleHandle { kind: "actor", .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Physics
    // -----------------------------------------------------------------------

    #[test]
    fn primitive_descriptor_is_a_body() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let body = body_of(&mut bridge, actor);

        assert_eq!(bridge.is_simulating(body), Ok(false));
        host(&mut bridge).set_simulating(body, true);
        assert_eq!(bridge.is_simulating(body), Ok(true));
    }

    #[test]
    fn impulse_changes_velocity_immediately() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 100.0);
        let body = simulating_body(&mut bridge, actor);

        bridge.add_impulse(body, Vector3::new(0.0, 0.0, 10.0)).unwrap();
        assert_eq!(bridge.velocity(body), Ok(Vector3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn force_applies_on_tick_and_moves_actor() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 100.0);
        let body = simulating_body(&mut bridge, actor);

        bridge.add_impulse(body, Vector3::new(0.0, 0.0, 10.0)).unwrap();
        bridge.add_force(body, Vector3::new(10.0, 0.0, 0.0)).unwrap();
        assert_eq!(bridge.velocity(body), Ok(Vector3::new(0.0, 0.0, 10.0)));

        bridge.tick_actor(actor, 0.5).unwrap();
        assert_eq!(bridge.velocity(body), Ok(Vector3::new(5.0, 0.0, 10.0)));
        assert_eq!(
            bridge.spatial_data(actor).unwrap().position,
            Vector3::new(2.5, 0.0, 105.0)
        );
    }

    #[test]
    fn non_simulating_body_ignores_forces() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 100.0);
        let body = body_of(&mut bridge, actor);

        bridge.add_impulse(body, Vector3::new(0.0, 0.0, 10.0)).unwrap();
        bridge.set_velocity(body, Vector3::new(1.0, 1.0, 1.0)).unwrap();
        bridge.tick_actor(actor, 1.0).unwrap();

        assert_eq!(bridge.velocity(body), Ok(Vector3::ZERO));
        assert_eq!(
            bridge.spatial_data(actor).unwrap().position,
            Vector3::new(0.0, 0.0, 100.0)
        );
    }

    #[test]
    fn set_velocity_overrides_current_velocity() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let body = simulating_body(&mut bridge, actor);

        bridge.add_impulse(body, Vector3::new(3.0, 0.0, 0.0)).unwrap();
        bridge.set_velocity(body, Vector3::new(0.0, -4.0, 0.0)).unwrap();
        assert_eq!(bridge.velocity(body), Ok(Vector3::new(0.0, -4.0, 0.0)));
    }

    // -----------------------------------------------------------------------
    // Stale handles
    // -----------------------------------------------------------------------

    #[test]
    fn destroyed_actor_handles_go_stale() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let body = body_of(&mut bridge, actor);
        assert!(host(&mut bridge).destroy_actor(actor));

        assert!(bridge.spatial_data(actor).is_err());
        assert!(bridge.tick_actor(actor, 0.1).is_err());
        assert!(bridge.bind(actor, Entity::new(1)).is_err());
        assert!(matches!(
            bridge.velocity(body),
            Err(BridgeError::StaleHandle { kind: "body", .. })
        ));
        assert_eq!(bridge.stats().stale_handles, 4);
    }

    #[test]
    fn handle_values_are_not_reissued() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let first = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        host(&mut bridge).destroy_actor(first);
        let second = spawn_at(&mut bridge, 0.0, 0.0, 0.0);

        assert_ne!(first, second);
        assert_eq!(first.index(), second.index());
        assert!(bridge.spatial_data(first).is_err());
        assert!(bridge.spatial_data(second).is_ok());
    }

    #[test]
    fn null_and_forged_handles_are_rejected() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let _actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);

        assert!(bridge.spatial_data(ActorHandle::NULL).is_err());
        assert!(bridge.spatial_data(ActorHandle::from_parts(0, 9)).is_err());
        assert!(bridge.is_simulating(BodyHandle::NULL).is_err());
    }

    #[test]
    fn destroying_actor_unbinds_it() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let a = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let b = spawn_at(&mut bridge, 100.0, 0.0, 0.0);
        bridge.bind(a, Entity::new(1)).unwrap();
        bridge.bind(b, Entity::new(2)).unwrap();

        host(&mut bridge).destroy_actor(a);
        assert_eq!(bound_actors(&bridge), vec![b]);
    }

    // -----------------------------------------------------------------------
    // Line trace
    // -----------------------------------------------------------------------

    #[test]
    fn trace_in_empty_world_misses() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let hit = bridge.trace(Vector3::new(0.0, 0.0, 1000.0), Vector3::new(0.0, 0.0, -1000.0));

        assert!(hit.is_none());
        assert_eq!(bridge.stats().traces, 1);
        assert_eq!(bridge.stats().trace_hits, 0);
    }

    #[test]
    fn trace_reports_nearest_actor() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let near = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let _far = spawn_at(&mut bridge, 500.0, 0.0, 0.0);

        let hit = bridge
            .trace(Vector3::new(-1000.0, 0.0, 0.0), Vector3::new(1000.0, 0.0, 0.0))
            .expect("segment crosses both actors");
        assert_eq!(hit.actor, near);
        assert_eq!(hit.distance, 950.0);
        assert_eq!(hit.location, Vector3::new(-50.0, 0.0, 0.0));
        assert_eq!(hit.impact_location, hit.location);
        assert_eq!(hit.normal, Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(hit.penetration_depth, 0.0);
        assert_eq!(bridge.stats().trace_hits, 1);
    }

    #[test]
    fn zero_length_trace_never_hits() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let _actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        let p = Vector3::new(0.0, 0.0, 0.0);

        assert!(bridge.trace(p, p).is_none());
    }

    #[test]
    fn trace_starting_inside_reports_penetration() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);

        let hit = bridge
            .trace(Vector3::new(20.0, 0.0, 0.0), Vector3::new(20.0, 0.0, 500.0))
            .expect("origin inside the sphere");
        assert_eq!(hit.actor, actor);
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.penetration_depth, 30.0);
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    #[test]
    fn action_state_prefers_pressed_over_held() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        {
            let input = host(&mut bridge).input_mut();
            input.bind_action("Jump", "SpaceBar");
            input.bind_action("Jump", "Gamepad_A");
            input.press("SpaceBar");
        }
        host(&mut bridge).step(0.0);
        assert_eq!(bridge.action_state("Jump"), ActionState::Held);

        host(&mut bridge).input_mut().press("Gamepad_A");
        assert_eq!(bridge.action_state("Jump"), ActionState::Pressed);

        host(&mut bridge).step(0.0);
        host(&mut bridge).input_mut().release("Gamepad_A");
        assert_eq!(bridge.action_state("Jump"), ActionState::Released);

        host(&mut bridge).step(0.0);
        assert_eq!(bridge.action_state("Jump"), ActionState::Held);
    }

    #[test]
    fn unknown_action_and_axis_are_neutral() {
        let bridge = make_bridge(RebindPolicy::Replace);
        assert_eq!(bridge.action_state("Nope"), ActionState::Nothing);
        assert_eq!(bridge.axis_value("Nope"), 0.0);
    }

    #[test]
    fn axis_and_mouse_delta_come_from_the_host() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        {
            let input = host(&mut bridge).input_mut();
            input.bind_axis("Turn", "Right", 1.0);
            input.bind_axis("Turn", "Left", -1.0);
            input.press("Left");
            input.move_mouse(4.0, -2.0);
        }
        assert_eq!(bridge.axis_value("Turn"), -1.0);
        assert_eq!(bridge.mouse_delta(), (4.0, -2.0));
        assert_eq!(bridge.mouse_delta(), (0.0, 0.0));
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    #[test]
    fn log_forwards_text_to_host() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let recorder = host(&mut bridge).recorder();

        bridge.log_bytes(b"spawned wave 3");
        bridge.log_bytes(b"");
        bridge.log_bytes(&[b'o', b'k', 0xFF]);

        assert_eq!(recorder.lines(), vec!["spawned wave 3", "ok\u{FFFD}"]);
        assert_eq!(bridge.stats().log_lines, 2);
    }

    #[test]
    fn visual_segment_is_recorded_against_actor() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let recorder = host(&mut bridge).recorder();
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);

        bridge
            .visual_segment(actor, Vector3::ZERO, Vector3::new(0.0, 0.0, -100.0), Color::RED)
            .unwrap();

        let segments = recorder.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].actor, actor);
        assert_eq!(segments[0].color, Color::RED);
        assert_eq!(segments[0].end.z, -100.0);
    }

    #[test]
    fn visual_segment_for_stale_actor_is_dropped() {
        let mut bridge = make_bridge(RebindPolicy::Replace);
        let recorder = host(&mut bridge).recorder();
        let actor = spawn_at(&mut bridge, 0.0, 0.0, 0.0);
        host(&mut bridge).destroy_actor(actor);

        assert!(bridge
            .visual_segment(actor, Vector3::ZERO, Vector3::ONE, Color::WHITE)
            .is_err());
        assert!(recorder.segments().is_empty());
    }
}
