// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouped shapes on a headless canvas, clicked and restyled.
//!
//! This example shows how to:
//! - record shapes into overlapping named collections with a collect window,
//! - listen on collections and on single shapes, in both phases,
//! - restyle a whole collection after it was clicked.
//!
//! Run:
//! - `RUST_LOG=understory_canvas=trace cargo run -p understory_demos --example click_groups`

use std::cell::Cell;
use std::f64::consts::TAU;
use std::rc::Rc;

use kurbo::Point;
use tracing_subscriber::EnvFilter;
use understory_canvas::{
    Listen, Node, OffscreenCanvas, Phase, PointerEventKind, PointerInput, focus,
};
use understory_pixel_hit::{Color, StateValue};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // The canvas sits 8px from the client origin, as if it had a margin.
    let host = OffscreenCanvas::new(480, 480).with_origin(Point::new(8.0, 8.0));
    let mut ctx = focus(host).expect("offscreen canvas has a 2D context");

    // A grey backdrop outside every named collection.
    ctx.begin_path();
    ctx.set_fill_style("#c1c1c1".parse().expect("valid colour"));
    ctx.rect(20.0, 20.0, 100.0, 100.0);
    let backdrop = ctx.fill().expect("identity available").expect("fill is hooked");

    ctx.start_collect("dots");
    ctx.begin_path();
    ctx.move_to(220.0, 80.0);
    ctx.arc(200.0, 80.0, 20.0, 0.0, TAU, false);
    ctx.fill().expect("identity available");
    ctx.stop_collect("dots");

    // One red square in both "squares" and "warm".
    ctx.start_collect(["squares", "warm"]);
    ctx.save();
    ctx.set_fill_style(Color::RED);
    ctx.begin_path();
    ctx.rect(300.0, 300.0, 20.0, 20.0);
    ctx.fill().expect("identity available");
    ctx.restore();

    // Only "warm" is still recording.
    ctx.stop_collect("squares");
    ctx.save();
    ctx.set_fill_style(Color::BLUE);
    ctx.begin_path();
    ctx.move_to(420.0, 400.0);
    ctx.arc(400.0, 400.0, 20.0, 0.0, TAU, false);
    ctx.fill().expect("identity available");
    ctx.restore();
    ctx.stop_collect_all();

    let dots_clicked = Rc::new(Cell::new(false));
    let flag = dots_clicked.clone();
    ctx.collection("dots").on(
        PointerEventKind::Click,
        move |event| {
            println!("dots clicked at {:?}", event.local());
            flag.set(true);
        },
        false,
    );
    ctx.collection("squares").on(
        PointerEventKind::Click,
        |event| println!("squares: {:?} phase on {:?}", event.phase(), event.current()),
        true,
    );
    ctx.collection("warm").on(
        PointerEventKind::Click,
        |event| {
            if let Node::Collection(_) = event.current() {
                println!("warm clicked, shape #{}", event.target().index());
            }
        },
        false,
    );
    ctx.shape(backdrop)
        .expect("backdrop was drawn here")
        .on(
            PointerEventKind::Click,
            |event| {
                assert_eq!(event.phase(), Phase::Bubble);
                println!("backdrop clicked; stopping here");
                event.stop_propagation();
            },
            false,
        );

    // Client coordinates include the 8px margin.
    for (x, y) in [(208.0, 88.0), (318.0, 318.0), (408.0, 408.0), (58.0, 58.0), (8.0, 8.0)] {
        let summary = ctx.handle_pointer_event(PointerInput::new(
            PointerEventKind::Click,
            Point::new(x, y),
        ));
        println!(
            "click ({x}, {y}) -> target {:?}, {} steps, {} listeners",
            summary.target.map(|id| id.index()),
            summary.steps,
            summary.listeners_fired,
        );
    }

    if dots_clicked.get() {
        ctx.collection("dots")
            .set_context_state(StateValue::FillStyle(Color::GREEN))
            .set_context_state(StateValue::GlobalAlpha(0.5))
            .render_context_state();
        println!(
            "dots repainted; centre pixel is now {:?}",
            ctx.rendering_context().pixel(200, 80)
        );
    }

    ctx.destroy();
    println!(
        "destroyed; native listeners left: {}",
        ctx.host().total_listeners()
    );
}
