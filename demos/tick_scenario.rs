use glam::Vec2;
use tilebonk::*;

const DT: f32 = 1000.0 / 60.0;

/// 50x30 level: solid floor on row 25, a ledge, and a pit at columns 30..33.
fn level() -> Vec<Vec<u8>> {
    let mut rows = vec![vec![0u8; 50]; 30];
    for (col, cell) in rows[25].iter_mut().enumerate() {
        if !(30..33).contains(&col) {
            *cell = 1;
        }
    }
    for cell in &mut rows[20][10..16] {
        *cell = 2;
    }
    rows
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = SimConfig::from_json(r#"{ "seed": 7, "enable_timing": true, "debug_collisions": true }"#)?;
    let mut sim = EntityManager::new(cfg)?;
    sim.set_grid(TileGrid::from_rows(&level(), 16.0)?);
    sim.register_callback(EntityKind::Actor, EntityKind::Obstacle, bounce_actor_off);

    let none = Overrides::default();
    let actor = sim.create_actor(Vec2::new(100.0, 300.0), &none)?;
    sim.create_wanderers(&none)?;
    sim.create_projectiles(3, &none)?;
    sim.create_obstacle(Vec2::new(600.0, 385.0), &none)?;
    println!("spawned {} entities, actor={}", sim.count(None), actor);

    let camera = Rect::default();
    for frame in 0..600u32 {
        let intent = Intent { right: frame % 240 < 160, left: frame % 240 >= 200, jump: frame % 90 < 8, ..Intent::default() };
        sim.set_actor_intent(intent);
        if frame % 120 == 0 {
            sim.spawn_explosion(Vec2::new(400.0, 200.0), 12, &Burst::default())?;
        }
        sim.tick(DT);

        let mut sink = RecordingSink::default();
        sim.render(&camera, &mut sink);

        for ev in sim.drain_events() {
            match ev {
                SimEvent::EntityRemoved { kind: EntityKind::Particle, .. } => {}
                other => println!("frame {frame}: {other:?}"),
            }
        }
        if frame % 100 == 0 {
            let s = sim.stats();
            println!(
                "frame {frame}: active={} pending={} pairs={} contacts={} update={:.3}ms physics={:.3}ms render={:.3}ms draws={}",
                s.active_entities,
                s.pending_destroy,
                s.collisions.pairs_tested,
                s.collisions.contacts,
                s.last_update_ms,
                s.last_physics_ms,
                s.last_render_ms,
                sink.commands.len()
            );
        }
    }

    if let Some(a) = sim.actor() {
        println!("actor at ({:.1}, {:.1}) state={:?}", a.body().pos.x, a.body().pos.y, a.state().variant);
    }
    let s = sim.stats();
    println!("pool: created={} reused={} free={}", s.pool.created, s.pool.reused, s.pool.free);
    Ok(())
}
