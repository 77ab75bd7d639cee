use std::sync::Arc;

use cueflow::{
    ChannelEvent, ChannelOptions, Element, EngineBuilder,
    vision::{Image, MemImageStore, StaticScreen},
};

fn main() {
    // black frame with a bright 8x8 block where the lobby image shows
    let mut pixels = vec![0u8; 64 * 64];
    for y in 16..24 {
        for x in 16..24 {
            pixels[y * 64 + x] = 200;
        }
    }
    let screen = StaticScreen::new(Image::new(64, 64, pixels).unwrap());

    let images = MemImageStore::new();
    images.insert("lobby.png", Image::filled(8, 8, 200));
    images.insert("game.png", Image::filled(8, 8, 90));

    let engine = EngineBuilder::new().screen(Arc::new(screen)).images(Arc::new(images)).build().unwrap();
    engine.launch();

    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_log(|log| {
        println!("[{}] {}", log.nid, log.content);
    });
    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_finished(|nid, result| {
        println!("{} finished: {:?}", nid, result);
    });

    let project = engine.load(include_str!("./project.json")).unwrap();
    engine.init(&project).unwrap();

    // one scheduler tick; deferred runs are awaited only to print their result
    for node in &project.nodes {
        let execution = engine.run(node);
        let result = engine.runtime().block_on(execution.wait());
        println!("{} -> {:?}", node.name(), result);
    }

    std::thread::sleep(std::time::Duration::from_millis(100));
    println!("counters: {:?}", engine.context().counter_values());

    engine.shutdown();
}
