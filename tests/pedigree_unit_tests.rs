#![allow(unused_imports, unused_mut)]

extern crate whimbrel;

use whimbrel::error::PhasingError;
use whimbrel::pedigree::genetic_map::{GeneticMap, MapEntry};
use whimbrel::pedigree::recombination::{
    find_recombination_events, recombination_cost_map, uniform_recombination_map, MAX_RECOMB_COST,
};
use whimbrel::pedigree::Pedigree;
use whimbrel::phasing::pedigree_partitions::PedigreePartitions;

fn quartet() -> Pedigree {
    let mut pedigree = Pedigree::new();
    pedigree.add_sample("HG002");
    pedigree.add_sample("HG005");
    pedigree.add_sample("father");
    pedigree.add_sample("mother");
    pedigree.add_trio("HG002", "father", "mother").unwrap();
    pedigree.add_trio("HG005", "father", "mother").unwrap();
    pedigree
}

#[test]
fn test_quartet_structure() {
    let pedigree = quartet();
    assert_eq!(pedigree.sample_count(), 4);
    assert_eq!(pedigree.trios().len(), 2);
    assert_eq!(pedigree.founder_count(), 2);
    assert_eq!(pedigree.transmission_bit_count(), 4);
    assert!(pedigree.is_founder(pedigree.sample_index("father").unwrap()));
    assert!(!pedigree.is_founder(pedigree.sample_index("HG002").unwrap()));
}

#[test]
fn test_quartet_partitions_share_parents() {
    let pedigree = quartet();
    // four haplotype classes: two founders times two
    let partitions = PedigreePartitions::new(&pedigree, 0);
    assert_eq!(partitions.count(), 4);
    let hg002 = pedigree.sample_index("HG002").unwrap();
    let hg005 = pedigree.sample_index("HG005").unwrap();
    // with all-zero transmission both children inherit the same classes
    assert_eq!(partitions.partition(hg002, 0), partitions.partition(hg005, 0));
    assert_eq!(partitions.partition(hg002, 1), partitions.partition(hg005, 1));

    // flipping HG005's father bit separates the paternal classes
    let partitions = PedigreePartitions::new(&pedigree, 0b0100);
    assert_ne!(partitions.partition(hg002, 0), partitions.partition(hg005, 0));
    assert_eq!(partitions.partition(hg002, 1), partitions.partition(hg005, 1));
}

#[test]
fn test_uniform_cost_map_scales_with_distance() {
    let positions = vec![0, 1_000, 1_000_000];
    let costs = uniform_recombination_map(1.26, &positions);
    assert_eq!(costs.len(), 3);
    assert_eq!(costs[0], 0);
    // crossing a megabase is much cheaper than crossing a kilobase
    assert!(costs[2] < costs[1]);
    assert!(costs[1] > 0);
}

#[test]
fn test_genetic_map_cost_map() {
    let map = GeneticMap::new(vec![
        MapEntry {
            position: 0,
            centimorgan: 0.0,
        },
        MapEntry {
            position: 1_000_000,
            centimorgan: 2.0,
        },
    ])
    .unwrap();
    let positions = vec![100_000, 200_000, 900_000];
    let costs = recombination_cost_map(&map, &positions);
    assert_eq!(costs[0], 0);
    // 0.2 cM vs 1.4 cM between the pairs
    assert!(costs[1] > costs[2]);
}

#[test]
fn test_zero_distance_clamps_instead_of_overflowing() {
    let map = GeneticMap::new(vec![
        MapEntry {
            position: 0,
            centimorgan: 0.0,
        },
        MapEntry {
            position: 1_000_000,
            centimorgan: 0.0,
        },
    ])
    .unwrap();
    let costs = recombination_cost_map(&map, &[100, 200]);
    assert_eq!(costs[1], MAX_RECOMB_COST);
}

#[test]
fn test_quartet_recombination_events() {
    let pedigree = quartet();
    let positions = vec![68735433, 68738308, 68750000];
    let costs = vec![0, 44, 44];
    // both children flip their paternal bit between the first two columns
    // (HG002 bit 0, HG005 bit 2)
    let transmission = vec![0b0000, 0b0101, 0b0101];
    let events = find_recombination_events(&transmission, &pedigree, &positions, &costs);
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.position1, 68735433);
        assert_eq!(event.position2, 68738308);
        assert_ne!(event.transmitted_hap_father1, event.transmitted_hap_father2);
        assert_eq!(event.transmitted_hap_mother1, event.transmitted_hap_mother2);
        assert_eq!(event.recombination_cost, 44);
    }
    let children: Vec<&str> = events.iter().map(|e| e.child.as_str()).collect();
    assert_eq!(children, vec!["HG002", "HG005"]);
}

#[test]
fn test_genetic_map_file_errors() {
    assert!(GeneticMap::new(vec![]).is_err());
    let result = GeneticMap::from_path("/nonexistent/genetic.map");
    match result {
        Err(PhasingError::InvalidInput { .. }) => {}
        other => panic!("expected InvalidInput, got {:?}", other),
    }
}
