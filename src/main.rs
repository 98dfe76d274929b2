use std::time::Instant;

use osm_traffic::{parse_xml, PhysicalAttributes, World};

fn main() {
    let path = std::env::args().nth(1).expect("usage: osm-traffic <extract.osm>");
    let xml = std::fs::read_to_string(&path).expect("could not read extract");

    let pool = rayon::ThreadPoolBuilder::new()
        .build()
        .expect("could not build thread pool");
    let start = Instant::now();
    let segment = parse_xml(&xml, &pool).expect("could not parse extract");
    println!(
        "Parsed {} nodes, {} ways, {} relations in {:?}",
        segment.nodes().len(),
        segment.ways().len(),
        segment.relations().len(),
        start.elapsed(),
    );

    let start = Instant::now();
    let mut world = World::new(segment);
    println!(
        "Built graph with {} nodes in {:?}",
        world.graph().len(),
        start.elapsed(),
    );

    let mut rng = rand::thread_rng();
    world.spawn_random_agents(1000, &PhysicalAttributes::default(), &mut rng);
    world.randomise_agent_speeds(0.1);

    println!("Simulating...");
    const NUM_FRAMES: u32 = 1000;
    loop {
        let start = Instant::now();
        for _ in 0..NUM_FRAMES {
            world.step(0.1);
        }
        let frame = start.elapsed() / NUM_FRAMES;
        println!(
            "Avg. frame: {:?} ({} agents alive, {} reaped last step)",
            frame,
            world.agent_count(),
            world.reaped().len(),
        );
        if world.agent_count() == 0 {
            break;
        }
    }
}
