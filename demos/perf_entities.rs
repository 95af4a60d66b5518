use glam::Vec2;
use std::time::Instant;
use tilebonk::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = SimConfig {
        world: Rect::new(0.0, 0.0, 4000.0, 2000.0),
        pool_capacity: 5_000,
        enable_timing: true,
        ..SimConfig::default()
    };
    let mut sim = EntityManager::new(cfg)?;
    let mut grid = TileGrid::new(250, 125, 16.0)?;
    for col in 0..250 {
        grid.set(col, 120, 1);
    }
    sim.set_grid(grid);

    let n = 2_000usize;
    let none = Overrides::default();
    for i in 0..n {
        let x = 20.0 + (i % 200) as f32 * 19.5;
        let y = 100.0 + (i / 200) as f32 * 150.0;
        if i % 2 == 0 {
            sim.create_projectile(Vec2::new(x, y), Vec2::new(40.0, 0.0), &none)?;
        } else {
            sim.spawn_particle(Vec2::new(x, y), None, &Overrides { life: Some(2_000.0), ..none.clone() })?;
        }
    }

    let frames = 120;
    let t0 = Instant::now();
    let (mut update_ms, mut physics_ms) = (0.0, 0.0);
    for frame in 0..frames {
        if frame % 30 == 0 {
            sim.spawn_explosion(Vec2::new(2000.0, 500.0), 200, &Burst::default())?;
        }
        sim.tick(1000.0 / 60.0);
        let s = sim.stats();
        update_ms += s.last_update_ms;
        physics_ms += s.last_physics_ms;
        sim.drain_events();
    }
    let total = t0.elapsed();
    let s = sim.stats();
    println!(
        "N={} frames={} total={:.3}ms avg update={:.3}ms physics={:.3}ms pairs/frame={} contacts={} pool reused={}",
        n,
        frames,
        total.as_secs_f64() * 1000.0,
        update_ms / frames as f64,
        physics_ms / frames as f64,
        s.collisions.pairs_tested,
        s.collisions.contacts,
        s.pool.reused
    );
    Ok(())
}
