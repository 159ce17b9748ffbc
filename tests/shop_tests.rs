mod support;

use bazaar::domain::{ItemId, StockStatus};
use support::{World, ALICE, BOB, MODERATOR};

async fn stocked(world: &World, command: &str) {
    world.register_all().await;
    let reply = world.reply(MODERATOR, command).await;
    assert!(reply.ends_with("has been added to the shop."), "{reply}");
}

#[tokio::test]
async fn resale_returns_a_quarter_of_the_price() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Hat) 100 5").await;

    let bought = world.reply(ALICE, "!buy (hat)").await;
    assert_eq!(bought, "1 Hat purchased for $100. Wallet: $400.");

    let alice = world.user(ALICE).await;
    let entry = &alice.inventory[&ItemId::new(1)];
    assert_eq!((entry.quantity, entry.value), (1, 25));
    assert_eq!(
        world.shop().await.items[&ItemId::new(1)].stock_status(),
        StockStatus::Available(4)
    );

    let sold = world.reply(ALICE, "!sell (Hat)").await;
    assert_eq!(sold, "Sold 1 Hat for a total of $25. Wallet: $425.");
    assert!(world.user(ALICE).await.inventory.is_empty());
}

#[tokio::test]
async fn limited_stock_runs_out() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Lamp) 10 2").await;

    world.say(ALICE, "!buy (Lamp) 2").await;
    let reply = world.reply(BOB, "!buy (Lamp)").await;
    assert_eq!(reply, "There are not enough Lamp in stock.");
    assert_eq!(world.wallet(BOB).await, 500);
    assert_eq!(
        world.shop().await.items[&ItemId::new(1)].stock_status(),
        StockStatus::OutOfStock
    );
}

#[tokio::test]
async fn funds_are_checked_before_stock() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Crown) 400 0").await;

    let reply = world.reply(ALICE, "!buy (Crown) 2").await;
    assert!(reply.starts_with("You do not have enough money"), "{reply}");
    let reply = world.reply(ALICE, "!buy (Crown)").await;
    assert_eq!(reply, "There are not enough Crown in stock.");
}

#[tokio::test]
async fn selling_more_than_owned_is_refused() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Hat) 100").await;
    world.say(ALICE, "!buy (Hat) 2").await;

    let reply = world.reply(ALICE, "!sell (Hat) 3").await;
    assert_eq!(reply, "You do not have 3 Hat (you own 2).");
    assert_eq!(world.wallet(ALICE).await, 300);
}

#[tokio::test]
async fn deleted_items_leave_the_listing_but_can_still_be_bought() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Hat) 100").await;

    let reply = world.reply(MODERATOR, "!delete_shop_item (Hat)").await;
    assert_eq!(reply, "Hat successfully removed from the shop.");
    assert_eq!(world.reply(ALICE, "!shop").await, "The shop is currently empty.");

    let bought = world.reply(ALICE, "!buy (Hat)").await;
    assert_eq!(bought, "1 Hat purchased for $100. Wallet: $400.");
}

#[tokio::test]
async fn edits_apply_known_attributes_and_reactivate() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Hat) 100").await;
    world.say(MODERATOR, "!delete_shop_item (Hat)").await;

    let reply = world
        .reply(MODERATOR, "!edit_shop_item (Hat) (price) (40) (colour) (red)")
        .await;
    assert_eq!(
        reply,
        "Hat successfully edited. Skipped unknown attributes: colour."
    );

    let item = world.shop().await.items[&ItemId::new(1)].clone();
    assert!(item.active);
    assert_eq!(item.price.to_string(), "$40");

    let listing = world.reply(ALICE, "!shop").await;
    assert!(listing.contains("#1 Hat: Price: $40 | Unlimited stock"), "{listing}");
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Hat) 100").await;

    let reply = world.reply(MODERATOR, "!create_shop_item (HAT) 5").await;
    assert_eq!(reply, "HAT already exists in the shop.");
    assert_eq!(world.shop().await.items.len(), 1);
}

#[tokio::test]
async fn members_cannot_stock_the_shop() {
    let world = World::new();
    world.register_all().await;

    let deliveries = world.say(ALICE, "!create_shop_item (Hat) 100").await;
    assert!(deliveries.is_empty());
    assert!(world.shop().await.items.is_empty());
}

#[tokio::test]
async fn inventory_lists_value() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Hat) 100").await;
    world.say(ALICE, "!buy (Hat) 2").await;

    let inventory = world.reply(ALICE, "!inventory").await;
    assert!(inventory.contains("Alice's Inventory"), "{inventory}");
    assert!(inventory.contains("Total value: $50"), "{inventory}");
}

#[tokio::test]
async fn oversized_orders_are_refused_without_side_effects() {
    let world = World::new();
    stocked(&world, "!create_shop_item (Pebble) 4").await;

    let reply = world.reply(ALICE, "!buy (Pebble) 4611686018427387904").await;
    assert_eq!(reply, "That order is too large.");
    let reply = world.reply(ALICE, "!buy (Pebble) 18446744073709551615").await;
    assert_eq!(reply, "That order is too large.");

    assert_eq!(world.wallet(ALICE).await, 500);
    assert!(world.user(ALICE).await.inventory.is_empty());

    let reply = world.reply(ALICE, "!sell (Pebble) 1000000000000").await;
    assert_eq!(reply, "You do not have 1000000000000 Pebble (you own 0).");
    assert_eq!(world.wallet(ALICE).await, 500);
}
