//! Terminal rendering. The only module that writes to stdout.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use pva_market_admin::AdminView;
use pva_market_admin::board::OrderBoard;
use pva_market_core::{CartItem, ChatMessage, ChatRole, Order, Price, Product, User};

use crate::context::CliError;

pub fn failure(err: &CliError) {
    eprintln!("error: {}", err.user_message());
}

pub fn line(message: &str) {
    println!("{message}");
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products.");
        return;
    }
    for product in products {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{:<14} {:<11} {:>10}  {} ({stock})",
            product.id.to_string(),
            product.category.to_string(),
            product.price.to_string(),
            product.title
        );
    }
}

pub fn cart(items: &[CartItem], total: Price) {
    if items.is_empty() {
        println!("Cart is empty.");
        return;
    }
    for item in items {
        let line_total = item.line_total();
        println!(
            "{:<14} {:>3} x {:>10} = {:>10}  {}",
            item.product.id.to_string(),
            item.quantity,
            item.product.price.to_string(),
            line_total.to_string(),
            item.product.title
        );
    }
    println!("Total: {total}");
}

pub fn user(user: Option<&User>) {
    match user {
        Some(user) => println!("{} <{}> ({})", user.name, user.email, user.id),
        None => println!("Not logged in."),
    }
}

pub fn order(order: &Order) {
    println!(
        "{}  {}  {:<10}  {:>10}  {} item(s)",
        order.id,
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.status.to_string(),
        order.total.to_string(),
        order.unit_count()
    );
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders.");
        return;
    }
    for entry in orders {
        order(entry);
    }
}

pub fn chat(history: &[ChatMessage]) {
    for message in history {
        let who = match message.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "assistant",
        };
        println!("{who}: {}", message.text);
    }
}

pub fn board(view: &AdminView) {
    print_board(&view.board);
    if view.loading {
        println!("(loading)");
    }
}

fn print_board(board: &OrderBoard) {
    let counts = board.counts();
    let synced = board
        .synced_at()
        .map_or_else(|| "never".to_string(), |at| at.format("%H:%M:%S").to_string());
    println!(
        "{} orders | pending {} | processing {} | shipped {} | completed {} | revenue {} | synced {synced}",
        board.len(),
        counts.pending,
        counts.processing,
        counts.shipped,
        counts.completed,
        board.revenue()
    );
    orders(board.orders());
}
